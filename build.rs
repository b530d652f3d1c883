fn main() {
    println!("cargo:rerun-if-changed=components/tflm_bridge");

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
