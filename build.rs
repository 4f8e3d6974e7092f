use anyhow::*;
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;
use std::env;
use std::path::PathBuf;

// Mirrors assets/ (fonts, matcaps, models, scene.json) next to the build output
// so the binary can be started from there.
fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets");
    println!("cargo:rerun-if-env-changed=GREETING_ASSET_DIR");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets_src = manifest_dir.join("assets");
    if !assets_src.exists() {
        println!("cargo:warning=no assets/ directory, the greeting will start empty");
        return Ok(());
    }

    let out_dir = env::var("OUT_DIR")?;
    let mut copy_options = CopyOptions::new();
    copy_options.overwrite = true;
    copy_items(&[assets_src], out_dir, &copy_options)?;

    Ok(())
}
