//! Interface de linha de comando do rtl-runner baseada em clap.
//!
//! Define a struct [`Cli`] com as flags de seleção de fase
//! (`--*-only`, `--skip-*`) e as flags globais (--config, --verbose...).

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use crate::runner::PhaseSelection;
use crate::tracker::Phase;

/// Dispara e acompanha jobs de RTL (generate, simulate, export) no Inoculator.
#[derive(Debug, Parser)]
#[command(name = "rtl-runner", version, about)]
#[command(group(
    ArgGroup::new("phases")
        .args([
            "generate_only",
            "simulate_only",
            "export_only",
            "skip_generate",
            "skip_simulate",
            "skip_export",
        ])
        .multiple(false)
))]
pub struct Cli {
    /// Executa apenas a fase de geração de RTL.
    #[arg(long)]
    pub generate_only: bool,

    /// Executa apenas a fase de simulação.
    #[arg(long)]
    pub simulate_only: bool,

    /// Executa apenas a fase de exportação.
    #[arg(long)]
    pub export_only: bool,

    /// Pula a fase de geração.
    #[arg(long)]
    pub skip_generate: bool,

    /// Pula a fase de simulação.
    #[arg(long)]
    pub skip_simulate: bool,

    /// Pula a fase de exportação.
    #[arg(long)]
    pub skip_export: bool,

    /// Caminho do arquivo de configuração TOML (padrão: inoculator.toml).
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Diretório onde a pasta de resultados será criada.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Abre o navegador com janela visível.
    #[arg(long, default_value_t = false)]
    pub no_headless: bool,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    /// Traduz as flags de fase para a seleção usada pelo runner.
    pub fn phase_selection(&self) -> PhaseSelection {
        let only = [
            (self.generate_only, Phase::Generate),
            (self.simulate_only, Phase::Simulate),
            (self.export_only, Phase::Export),
        ];
        if let Some((_, phase)) = only.into_iter().find(|(on, _)| *on) {
            return PhaseSelection::only(phase);
        }

        let skip = [
            (self.skip_generate, Phase::Generate),
            (self.skip_simulate, Phase::Simulate),
            (self.skip_export, Phase::Export),
        ];
        if let Some((_, phase)) = skip.into_iter().find(|(on, _)| *on) {
            return PhaseSelection::skip(phase);
        }

        PhaseSelection::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn no_flags_runs_everything() {
        let cli = Cli::parse_from(["rtl-runner"]);
        assert_eq!(cli.phase_selection(), PhaseSelection::all());
        assert!(cli.config.is_none());
        assert!(!cli.no_headless);
    }

    #[test]
    fn only_flag_selects_single_phase() {
        let cli = Cli::parse_from(["rtl-runner", "--simulate-only"]);
        assert_eq!(
            cli.phase_selection(),
            PhaseSelection::only(Phase::Simulate)
        );
    }

    #[test]
    fn skip_flag_drops_one_phase() {
        let cli = Cli::parse_from(["rtl-runner", "--skip-export", "-v"]);
        assert!(cli.verbose);
        assert_eq!(
            cli.phase_selection().phases(),
            vec![Phase::Generate, Phase::Simulate]
        );
    }

    #[test]
    fn phase_flags_are_mutually_exclusive() {
        assert!(Cli::try_parse_from(["rtl-runner", "--generate-only", "--export-only"]).is_err());
        assert!(Cli::try_parse_from(["rtl-runner", "--skip-generate", "--skip-export"]).is_err());
        assert!(Cli::try_parse_from(["rtl-runner", "--export-only", "--skip-simulate"]).is_err());
    }

    #[test]
    fn parses_paths_and_headless() {
        let cli = Cli::parse_from([
            "rtl-runner",
            "--config",
            "ci.toml",
            "--output",
            "out",
            "--no-headless",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("ci.toml")));
        assert_eq!(cli.output, Some(PathBuf::from("out")));
        assert!(cli.no_headless);
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
