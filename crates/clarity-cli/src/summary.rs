use clarity_core::config::DeconvolutionMethod;
use console::Style;

use crate::job::JobConfig;

struct Styles {
    title: Style,
    label: Style,
    value: Style,
    method: Style,
    good: Style,
    bad: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            good: Style::new().green(),
            bad: Style::new().red(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_job_summary(job: &JobConfig, device_name: &str) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Clarity Deconvolution"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(21)));
    println!();

    println!(
        "  {:<14}{} ({})",
        s.label.apply_to("Input"),
        s.path.apply_to(job.input.path.display()),
        job.input.dim
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(job.output.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Device"),
        s.method.apply_to(device_name)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Kernel"),
        s.value.apply_to(job.kernel.describe())
    );
    let detail = match job.engine.method {
        DeconvolutionMethod::Wiener { epsilon } => format!("epsilon {epsilon}"),
        _ => format!("{} iterations", job.engine.method.iterations().unwrap_or(0)),
    };
    println!(
        "  {:<14}{} {}",
        s.label.apply_to("Method"),
        s.method.apply_to(job.engine.method.name()),
        s.label.apply_to(detail)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Working"),
        s.value.apply_to(job.input.dim.working(job.kernel.dim()))
    );
    println!();
}

pub fn print_rms_table(device_name: &str, baseline: f32, errors: &[f32]) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to(format!("RMS error vs. truth ({device_name})")));
    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("blurred"),
        s.value.apply_to(format!("{baseline:.6}"))
    );

    let mut monotonic = true;
    for (i, &e) in errors.iter().enumerate() {
        let rose = i > 0 && e > errors[i - 1];
        monotonic &= !rose;
        let style = if rose { &s.bad } else { &s.value };
        println!(
            "  {:<14}{}",
            s.label.apply_to(format!("iteration {}", i + 1)),
            style.apply_to(format!("{e:.6}"))
        );
    }
    println!();
    if monotonic {
        println!("  {}", s.good.apply_to("RMS decreased monotonically"));
    } else {
        println!("  {}", s.bad.apply_to("RMS did not decrease monotonically"));
    }
    println!();
}
