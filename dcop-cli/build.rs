use std::env;
use std::process::Command;
use std::str::from_utf8;

fn rustc_version() -> Option<String> {
    let rustc = env::var_os("RUSTC")?;
    let output = Command::new(rustc).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    from_utf8(&output.stdout)
        .ok()
        .map(|version| version.trim().to_owned())
}

fn main() {
    let rustc = rustc_version().unwrap_or_else(|| {
        println!("cargo:warning=could not query the rustc version");
        "unknown rustc".to_owned()
    });
    println!("cargo:rustc-env=DCOP_RUSTC_VERSION={}", rustc);

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_owned());
    println!("cargo:rustc-env=DCOP_PROFILE={}", profile);
}
