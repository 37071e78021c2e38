// Licensed under the Apache-2.0 license

mod blocking_transfer_test;
mod hts221_test;
