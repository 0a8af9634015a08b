//! Standalone sandbox child. Same behavior as `trustd sandbox-child`.

use trustd_core::sandbox::{child::run_child, platform_limiter};

fn main() {
    let limiter = platform_limiter();
    let code = run_child(
        std::io::stdin().lock(),
        std::io::stdout().lock(),
        std::io::stderr().lock(),
        limiter.as_ref(),
    );
    std::process::exit(code);
}
