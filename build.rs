use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=VW_LIB_DIR");
    println!("cargo:rerun-if-env-changed=VWBRIDGE_SHIM_DIR");
    println!("cargo:rerun-if-changed=native/vw_shim.h");
    println!("cargo:rerun-if-changed=native/vw_shim.cc");

    // Only the `native` feature talks to the engine library.
    if env::var_os("CARGO_FEATURE_NATIVE").is_none() {
        return;
    }

    // Prebuilt libvwbridge_shim, compiled from native/vw_shim.cc
    match env::var("VWBRIDGE_SHIM_DIR") {
        Ok(dir) if !dir.is_empty() => println!("cargo:rustc-link-search=native={dir}"),
        _ => println!("cargo:warning=VWBRIDGE_SHIM_DIR not set, relying on the default linker path"),
    }
    println!("cargo:rustc-link-lib=dylib=vwbridge_shim");

    if let Ok(dir) = env::var("VW_LIB_DIR") {
        if !dir.is_empty() {
            println!("cargo:rustc-link-search=native={dir}");
        }
    }
    println!("cargo:rustc-link-lib=dylib=vw_core");
}
