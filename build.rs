fn main() {
    // Host builds have nothing to generate; firmware builds need the
    // ESP-IDF environment exported to rustc.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
