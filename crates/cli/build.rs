fn main() {
    // Short commit hash for the version banner, "unknown" outside a git checkout
    let commit = std::process::Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=GOLDCAP_COMMIT={}", commit);
    println!("cargo:rerun-if-changed=../../.git/HEAD");
}
