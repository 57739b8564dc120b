fn main() {
    // Only emit esp-idf link arguments when building for the device; host
    // test builds (--no-default-features) have no ESP-IDF toolchain.
    if std::env::var("CARGO_FEATURE_ESPIDF").is_ok() {
        embuild::espidf::sysenv::output();
    }
}
