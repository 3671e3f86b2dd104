use crate::configs::Config;

const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[2m";

const LOGO: [&str; 5] = [
    "  _                    _ _       _    ",
    " | |_ _   _ _ __   ___| (_)_ __ | | __",
    " | __| | | | '_ \\ / _ \\ | | '_ \\| |/ /",
    " | |_| |_| | | | |  __/ | | | | |   < ",
    "  \\__|\\__,_|_| |_|\\___|_|_|_| |_|_|\\_\\",
];

macro_rules! env_or {
    ($key:literal, $default:literal) => {
        option_env!($key).unwrap_or($default)
    };
}

/// Build facts baked in by `build.rs`.
pub struct BannerInfo {
    pub version: &'static str,
    pub branch: &'static str,
    pub commit: &'static str,
    pub profile: &'static str,
}

impl Default for BannerInfo {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            branch: env_or!("GIT_BRANCH", "unknown"),
            commit: env_or!("GIT_COMMIT", "unknown"),
            profile: if cfg!(debug_assertions) {
                "debug"
            } else {
                "release"
            },
        }
    }
}

impl BannerInfo {
    fn short_commit(&self) -> &str {
        self.commit.get(..7).unwrap_or(self.commit)
    }
}

pub fn print_banner(info: &BannerInfo, config: &Config) {
    println!();
    for line in LOGO {
        println!("{GREEN}{line}{RESET}");
    }
    println!("{DIM}========================================{RESET}");
    println!();

    let rows = [
        ("Version", info.version.to_string(), CYAN),
        ("Branch", info.branch.to_string(), RESET),
        ("Commit", info.short_commit().to_string(), RESET),
        ("Profile", info.profile.to_string(), YELLOW),
        ("Node", config.lavalink.rest_base(), CYAN),
        (
            "Idle timeout",
            format!("{}s", config.player.idle_timeout_secs),
            RESET,
        ),
    ];
    for (label, value, color) in rows {
        println!("  {BOLD}{label:<14}{RESET}{color}{value}{RESET}");
    }
    println!();
}
