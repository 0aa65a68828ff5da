use std::process::Command;

fn main() {
    // COMPOSE_RELAY_VERSION: release tooling may pin this at build time.
    // Falls back to CARGO_PKG_VERSION (from Cargo.toml) for local builds.
    let version = std::env::var("COMPOSE_RELAY_VERSION")
        .unwrap_or_else(|_| std::env::var("CARGO_PKG_VERSION").unwrap_or_default());
    println!("cargo:rustc-env=COMPOSE_RELAY_VERSION={version}");

    // COMPOSE_RELAY_COMMIT: falls back to `git rev-parse --short HEAD`,
    // then to "unknown" outside a checkout.
    let commit = std::env::var("COMPOSE_RELAY_COMMIT").unwrap_or_else(|_| {
        let output = Command::new("git")
            .args(["rev-parse", "--short", "HEAD"])
            .output();
        match output {
            Ok(o) if o.status.success() => String::from_utf8_lossy(&o.stdout).trim().to_string(),
            _ => "unknown".to_string(),
        }
    });
    println!("cargo:rustc-env=COMPOSE_RELAY_COMMIT={commit}");

    println!("cargo:rerun-if-env-changed=COMPOSE_RELAY_VERSION");
    println!("cargo:rerun-if-env-changed=COMPOSE_RELAY_COMMIT");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
