//! Links against the Firebird client library. The header-level bindings live in
//! `src/sys.rs` (hand-written, not bindgen-generated — the isc_*/fb_* surface we need
//! is small and stable enough not to warrant a build-time codegen step).

fn main() {
    if let Ok(dir) = std::env::var("FBCLIENT_LIB_DIR") {
        println!("cargo:rustc-link-search=native={dir}");
    }
    println!("cargo:rustc-link-lib=dylib=fbclient");
}
