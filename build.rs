/*
Only ESP-IDF targets need the build environment forwarded:
the host build runs against the simulated platform.
*/
use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }
}
