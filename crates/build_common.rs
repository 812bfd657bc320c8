// Shared build script helper that turns a crate README into crate-level rustdoc.
// Include this in build.rs files with: include!("../build_common.rs");
//
// Required imports in the including file:
//   use std::env;
//   use std::fs;
//   use std::path::Path;

/// Copy the crate's README.md into `OUT_DIR/README_GENERATED.md`.
///
/// Links of the form `](src/foo.rs)` are rewritten to `](foo)` so rustdoc
/// resolves them as modules. A crate without a README gets an empty page.
fn readme_to_rustdoc(crate_dir: &str) {
    println!("cargo:rerun-if-changed=README.md");

    let content = fs::read_to_string(Path::new(crate_dir).join("README.md")).unwrap_or_default();
    let rustdoc = content.replace("](src/", "](").replace(".rs)", ")");

    let out_dir = env::var("OUT_DIR").expect("cargo always sets OUT_DIR for build scripts");
    fs::write(Path::new(&out_dir).join("README_GENERATED.md"), rustdoc)
        .expect("OUT_DIR is writable");
}
