use std::{env, fs, path::PathBuf, process::Command};

fn run_bin(args: &[&str]) -> std::process::Output {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_contagion"));

    Command::new(bin)
        .args(args)
        .output()
        .expect("failed to execute command")
}

fn assert_success(args: &[&str]) {
    let output = run_bin(args);

    let stdout_str =
        std::str::from_utf8(&output.stdout).expect("failed to convert stdout to string");
    let stderr_str =
        std::str::from_utf8(&output.stderr).expect("failed to convert stderr to string");

    assert!(
        output.status.success(),
        "failed to run binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n"
    );
}

fn fresh_dir(name: &str) -> PathBuf {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);
    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");
    test_dir
}

#[test]
fn basic_workflow() {
    let test_dir = fresh_dir("basic_workflow");

    let config_path = test_dir.join("config.toml");
    let config_contents = String::new()
        + "time_steps = 0\n"
        + "env_dim = 50\n"
        + "pop_size = 400\n"
        + "initially_infected = 3\n"
        + "interaction_rate = 3\n"
        + "infection_rate = 0.2\n"
        + "mortality_rate = 0.02\n"
        + "recovery_mean = 12.0\n"
        + "recovery_sd = 3.0\n"
        + "asymptomatic_prob = 0.25\n"
        + "days_until_infectious = 2\n"
        + "seed = 7\n"
        + "plot_title = \"ignored\"\n";

    fs::write(&config_path, config_contents).expect("failed to write config file");

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    assert_success(&["--sim-dir", test_dir_str, "create"]);
    assert_success(&["--sim-dir", test_dir_str, "create"]);

    assert!(test_dir.join("run-0000").join("report.msgpack").is_file());
    assert!(test_dir.join("run-0001").join("report.msgpack").is_file());

    assert_success(&["--sim-dir", test_dir_str, "analyze"]);

    let analysis = fs::read_to_string(test_dir.join("analysis.json"))
        .expect("failed to read analysis file");
    let analysis: serde_json::Value =
        serde_json::from_str(&analysis).expect("failed to parse analysis file");
    assert_eq!(analysis["n_runs"], 2);
    assert!(analysis["peak_r_naught"]["mean"].as_f64().unwrap() >= 0.0);

    assert_success(&["--sim-dir", test_dir_str, "clean"]);

    assert!(!test_dir.join("run-0000").exists());
    assert!(!test_dir.join("analysis.json").exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn invalid_config_fails() {
    let test_dir = fresh_dir("invalid_config_fails");

    let config_path = test_dir.join("config.toml");
    let config_contents = String::new()
        + "time_steps = 0\n"
        + "env_dim = 50\n"
        + "pop_size = 400\n"
        + "initially_infected = 0\n"
        + "interaction_rate = 3\n"
        + "infection_rate = 0.2\n"
        + "mortality_rate = 0.02\n"
        + "recovery_mean = 12.0\n"
        + "recovery_sd = 3.0\n"
        + "asymptomatic_prob = 0.25\n"
        + "days_until_infectious = 2\n";

    fs::write(&config_path, config_contents).expect("failed to write config file");

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    let output = run_bin(&["--sim-dir", test_dir_str, "create"]);
    assert!(!output.status.success());
    assert!(!test_dir.join("run-0000").exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn mapping_driven_run() {
    use contagion::{Config, Engine};
    use serde_value::Value;
    use std::collections::BTreeMap;

    let mut map = BTreeMap::new();
    map.insert("time_steps".to_string(), Value::U64(5));
    map.insert("env_dim".to_string(), Value::U64(10));
    map.insert("pop_size".to_string(), Value::U64(50));
    map.insert("initially_infected".to_string(), Value::U64(2));
    map.insert("interaction_rate".to_string(), Value::U64(3));
    map.insert("infection_rate".to_string(), Value::F64(1.0));
    map.insert("mortality_rate".to_string(), Value::F64(0.0));
    map.insert("recovery_mean".to_string(), Value::F64(10.0));
    map.insert("recovery_sd".to_string(), Value::F64(2.0));
    map.insert("asymptomatic_prob".to_string(), Value::F64(0.25));
    map.insert("days_until_infectious".to_string(), Value::U64(1));
    map.insert("seed".to_string(), Value::U64(99));

    let cfg = Config::from_map(map).expect("failed to build config");

    let run = |cfg: Config| {
        let mut engine = Engine::new(cfg).expect("failed to construct engine");
        engine.run_sim().expect("failed to run simulation");
        engine.into_report().as_map()
    };

    let first = run(cfg.clone());
    let second = run(cfg);
    assert_eq!(first, second);

    for name in ["susceptible", "infectious", "recovered", "dead", "r_naught"] {
        assert_eq!(first[name].len(), 5, "{name}");
    }
    for i_step in 0..5 {
        let total: f64 = ["susceptible", "exposed", "infectious", "recovered", "dead"]
            .iter()
            .map(|name| first[*name][i_step])
            .sum();
        assert_eq!(total, 50.0);
    }
}
