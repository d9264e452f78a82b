use fetch_deps::{Dependency, Error};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

pub type TaskResult = Result<(), Error>;

/// What happened to one dependency: the steps performed, even if it then failed.
pub struct Outcome<'a> {
    pub dependency: &'a Dependency,
    pub log: Vec<String>,
    pub result: TaskResult,
}

fn make_progress_spinner(m: &MultiProgress, prefix: String) -> ProgressBar {
    let pb = m.add(ProgressBar::new_spinner());
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    pb.set_style(
        ProgressStyle::with_template("{prefix:.cyan.bold/blue.bold} 🔎 {msg:.cyan/blue} {spinner}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⣾⣽⣻⢿⡿⣟⣯⣷"),
    );
    pb.set_prefix(prefix);
    pb
}

fn complete_progress_bar(pb: ProgressBar, name: &str, result: &TaskResult) {
    let template = if result.is_ok() {
        "{prefix:.cyan.bold/blue.bold} {msg:.cyan/blue}"
    } else {
        "{prefix:.cyan.bold/blue.bold} {msg:.red.bold}"
    };
    if let Ok(style) = ProgressStyle::with_template(template) {
        pb.set_style(style);
    }
    let status = if result.is_ok() { "😸" } else { "😿" };
    pb.finish_with_message(format!("{status} {name}"));
}

// Run a task for a single dependency, reporting progress in the provided progress bar
fn run_one<'a, F>(
    dependency: &'a Dependency,
    verb: &str,
    task: &F,
    bar: ProgressBar,
) -> Outcome<'a>
where
    F: Fn(&Dependency, &mut Vec<String>) -> TaskResult,
{
    bar.set_message(format!("{verb} {}", dependency.name));
    let mut log = Vec::new();
    let result = task(dependency, &mut log);
    complete_progress_bar(bar, &dependency.name, &result);
    Outcome {
        dependency,
        log,
        result,
    }
}

/// Run `task` for each dependency with one spinner per dependency. With a single job the
/// dependencies are processed in order and the first failure stops the run. With more jobs they
/// are processed in parallel on the global `rayon` pool and every result is returned, in order.
pub fn run_each<'a, F>(
    dependencies: &[&'a Dependency],
    jobs: usize,
    verb: &str,
    task: F,
) -> Vec<Outcome<'a>>
where
    F: Fn(&Dependency, &mut Vec<String>) -> TaskResult + Sync,
{
    let count = dependencies.len();
    let mp = MultiProgress::new();
    let ordered_bars = (0..count)
        .map(|k| make_progress_spinner(&mp, format!("[{}/{count}]", k + 1)))
        .collect::<Vec<_>>();
    if jobs <= 1 {
        let mut results = Vec::with_capacity(count);
        for (bar, dependency) in ordered_bars.into_iter().zip(dependencies) {
            let outcome = run_one(dependency, verb, &task, bar);
            let failed = outcome.result.is_err();
            results.push(outcome);
            if failed {
                break;
            }
        }
        mp.clear().ok();
        return results;
    }
    use rayon::prelude::*;
    let results = ordered_bars
        .into_iter()
        .zip(dependencies.iter().copied())
        // Have to `collect()` first because we can't use parallel iterator with Zip
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(bar, dependency)| run_one(dependency, verb, &task, bar))
        .collect::<Vec<_>>();
    mp.clear().ok();
    results
}
