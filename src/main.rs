mod cli;

use clap::{Parser, Subcommand};

use cli::export::{cmd_export, ExportArgs};
use cli::infer::{cmd_infer, InferArgs};
use cli::inspect::{cmd_inspect, InspectArgs};
use cli::serve::{cmd_serve, ServeArgs};

#[derive(Parser)]
#[command(
    name = "script-serving",
    version,
    about = "Compile a fixed network to an artifact and serve artifacts over HTTP"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP model server
    Serve(ServeArgs),
    /// Construct, compile and save the example network
    Export(ExportArgs),
    /// Print an artifact's signature and layer configuration
    Inspect(InspectArgs),
    /// Run a JSON payload through an artifact
    Infer(InferArgs),
}

fn main() -> anyhow::Result<()> {
    script_serving::logging::init();
    match Cli::parse().command {
        Command::Serve(args) => cmd_serve(args),
        Command::Export(args) => cmd_export(args),
        Command::Inspect(args) => cmd_inspect(args),
        Command::Infer(args) => cmd_infer(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use script_serving::{ExportConfig, ServerConfig, Variant};

    fn parse(args: &[&str]) -> Command {
        let argv = std::iter::once("script-serving").chain(args.iter().copied());
        Cli::try_parse_from(argv).unwrap().command
    }

    #[test]
    fn serve_defaults_match_server_config() {
        let Command::Serve(args) = parse(&["serve"]) else {
            panic!("expected serve");
        };
        assert_eq!(args.into_config(), ServerConfig::default());
    }

    #[test]
    fn serve_flags_override_defaults() {
        let Command::Serve(args) = parse(&[
            "serve", "--host", "0.0.0.0", "-p", "9000", "-c", "2", "-b", "1", "-t", "4",
            "--invalidation-prob", "0.25",
        ]) else {
            panic!("expected serve");
        };
        let config = args.into_config();
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
        assert_eq!((config.model_capacity, config.buffer_size, config.threads), (2, 1, 4));
        assert_eq!(config.invalidation_prob, 0.25);
    }

    #[test]
    fn export_defaults_match_export_config() {
        let Command::Export(args) = parse(&["export"]) else {
            panic!("expected export");
        };
        assert_eq!(args.into_config(), ExportConfig::default());
    }

    #[test]
    fn export_accepts_variant_names() {
        let Command::Export(args) = parse(&["export", "--variant", "dict-input", "-o", "d.pt"]) else {
            panic!("expected export");
        };
        let config = args.into_config();
        assert_eq!(config.variant, Variant::DictInput);
        assert_eq!(config.output, std::path::PathBuf::from("d.pt"));
        assert!(Cli::try_parse_from(["script-serving", "export", "--variant", "graph"]).is_err());
    }
}
