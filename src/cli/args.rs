//! Clap argument types.

use clap::Parser;

use sops_init::init::Mode;

/// Initialize SOPS age keys in ${XDG_CONFIG_HOME:-$HOME/.config}/sops/age/keys.txt.
#[derive(Parser, Debug)]
#[command(name = "sops-init", version)]
pub struct Cli {
    /// Generate a new age key pair and install it (default is to prompt for
    /// an existing private key).
    #[arg(long, default_value_t = false)]
    pub generate: bool,
}

impl Cli {
    /// Key source selected by the flags.
    pub fn mode(&self) -> Mode {
        if self.generate {
            Mode::Generate
        } else {
            Mode::Prompt
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_prompt() {
        let cli = Cli::try_parse_from(["sops-init"]).unwrap();
        assert_eq!(cli.mode(), Mode::Prompt);
    }

    #[test]
    fn generate_flag_selects_generate() {
        let cli = Cli::try_parse_from(["sops-init", "--generate"]).unwrap();
        assert_eq!(cli.mode(), Mode::Generate);
    }

    #[test]
    fn rejects_unknown_flags() {
        assert!(Cli::try_parse_from(["sops-init", "--force"]).is_err());
    }
}
