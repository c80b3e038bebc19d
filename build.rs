use std::error::Error;

// Emits VERGEN_GIT_SHA, VERGEN_CARGO_TARGET_TRIPLE and VERGEN_RUSTC_SEMVER for
// `recipeci --version`.
fn main() -> Result<(), Box<dyn Error>> {
    let cargo = vergen_gitcl::CargoBuilder::default()
        .target_triple(true)
        .build()?;
    let git = vergen_gitcl::GitclBuilder::default().sha(true).build()?;
    let rustc = vergen_gitcl::RustcBuilder::default().semver(true).build()?;

    vergen_gitcl::Emitter::default()
        .add_instructions(&cargo)?
        .add_instructions(&git)?
        .add_instructions(&rustc)?
        .emit()?;
    Ok(())
}
