use crate::config::Config;
use crate::engine::Engine;
use crate::report::{Report, Summary};
use crate::stats::{Accumulator, AccumulatorReport};
use anyhow::{Context, Result};
use glob::glob;
use rmp_serde::{decode, encode};
use serde::Serialize;
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

/// Simulation directory holding a `config.toml` and one directory per run.
pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

/// Cross-run statistics of the run summaries.
#[derive(Debug, Serialize)]
pub struct Analysis {
    pub n_runs: usize,
    pub n_steps: AccumulatorReport,
    pub peak_infectious: AccumulatorReport,
    pub peak_infectious_step: AccumulatorReport,
    pub peak_r_naught: AccumulatorReport,
    pub final_recovered: AccumulatorReport,
    pub final_dead: AccumulatorReport,
    pub never_infected: AccumulatorReport,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    /// Run a new simulation and store its report in the next free run directory.
    pub fn create_run(&self) -> Result<()> {
        let run_idx = self.count_run_dirs().context("failed to count run dirs")?;

        let run_dir = self.run_dir(run_idx);
        fs::create_dir_all(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        // Successive runs of a seeded configuration are distinct but reproducible.
        let mut cfg = self.cfg.clone();
        cfg.seed = cfg.seed.map(|seed| seed.wrapping_add(run_idx as u64));

        let mut engine = Engine::new(cfg).context("failed to construct engine")?;
        let report = engine.run_sim().context("failed to run simulation")?;

        let summary = report.summary();
        log::info!("{summary:#?}");

        let report_file = self.report_file(run_idx);
        save_report(report, &report_file)
            .with_context(|| format!("failed to save {report_file:?}"))?;
        log::info!("saved {report_file:?}");

        Ok(())
    }

    /// Summarize every run and write the cross-run statistics.
    pub fn analyze_sim(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;

        let mut summaries = Vec::with_capacity(n_runs);
        for run_idx in 0..n_runs {
            let report_file = self.report_file(run_idx);
            let report = load_report(&report_file)
                .with_context(|| format!("failed to load {report_file:?}"))?;
            summaries.push(report.summary());
        }

        let analysis = analyze_summaries(&summaries);
        log::info!("{analysis:#?}");

        let analysis_file = self.analysis_file();
        let file = File::create(&analysis_file)
            .with_context(|| format!("failed to create {analysis_file:?}"))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &analysis)
            .context("failed to serialize analysis")?;
        writer.flush().context("failed to flush writer stream")?;
        log::info!("saved {analysis_file:?}");

        Ok(())
    }

    /// Remove every run directory and the analysis file.
    pub fn clean_sim(&self) -> Result<()> {
        for run_dir in self.run_dirs().context("failed to list run dirs")? {
            fs::remove_dir_all(&run_dir)
                .with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }

        let analysis_file = self.analysis_file();
        if analysis_file.exists() {
            fs::remove_file(&analysis_file)
                .with_context(|| format!("failed to remove {analysis_file:?}"))?;
            log::info!("removed {analysis_file:?}");
        }

        Ok(())
    }

    fn run_dirs(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let run_dirs = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .collect();
        Ok(run_dirs)
    }

    fn count_run_dirs(&self) -> Result<usize> {
        Ok(self.run_dirs()?.len())
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }

    fn report_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("report.msgpack")
    }

    fn analysis_file(&self) -> PathBuf {
        self.sim_dir.join("analysis.json")
    }
}

pub fn save_report<P: AsRef<Path>>(report: &Report, file: P) -> Result<()> {
    let file = file.as_ref();
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(file);
    encode::write(&mut writer, report).context("failed to serialize report")?;
    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}

pub fn load_report<P: AsRef<Path>>(file: P) -> Result<Report> {
    let file = file.as_ref();
    let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let mut reader = BufReader::new(file);
    let report = decode::from_read(&mut reader).context("failed to deserialize report")?;
    Ok(report)
}

pub fn analyze_summaries(summaries: &[Summary]) -> Analysis {
    let mut accs: [Accumulator; 7] = Default::default();
    for summary in summaries {
        let vals = [
            summary.n_steps as f64,
            summary.peak_infectious as f64,
            summary.peak_infectious_step as f64,
            summary.peak_r_naught,
            summary.final_recovered as f64,
            summary.final_dead as f64,
            summary.never_infected as f64,
        ];
        for (acc, val) in accs.iter_mut().zip(vals) {
            acc.add(val);
        }
    }

    let [n_steps, peak_infectious, peak_infectious_step, peak_r_naught, final_recovered, final_dead, never_infected] =
        accs.map(|acc| acc.report());

    Analysis {
        n_runs: summaries.len(),
        n_steps,
        peak_infectious,
        peak_infectious_step,
        peak_r_naught,
        final_recovered,
        final_dead,
        never_infected,
    }
}
