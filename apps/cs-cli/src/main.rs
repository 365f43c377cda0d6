use clap::{Parser, Subcommand};
use cs_app::{AppError, AppResult, Session, SessionSummary, SystemKind};
use cs_core::timing::{self, step_timing};
use cs_sim::{FrameStats, IntegratorType};
use cs_solver::{
    ConvergencePolicy, NewtonConfig, SolverError, central_difference_jacobian,
    finite_difference_jacobian, max_relative_error,
};
use cs_systems::{Planet, PlanetParams};
use nalgebra::DVector;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cs-cli")]
#[command(about = "clothsim CLI - headless mass-spring and particle simulation", long_about = None)]
struct Cli {
    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a number of frames and report the final state
    Run {
        /// oscillator, planet or cloth
        #[arg(long, default_value = "cloth")]
        system: String,
        /// Integrator name (e.g. "rk4", "backward-euler")
        #[arg(long, default_value = "forward-euler")]
        integrator: String,
        /// Step length in seconds (clamped to 1e-5..=0.05)
        #[arg(long, default_value_t = 1e-4)]
        dt: f64,
        /// Integrator steps per frame (clamped to 1..=1000)
        #[arg(long, default_value_t = 5)]
        steps_per_frame: usize,
        /// Number of frames to simulate
        #[arg(long, default_value_t = 100)]
        frames: usize,
        /// Cloth particles per row (clamped to 1..=40)
        #[arg(long, default_value_t = 4)]
        size_x: usize,
        /// Cloth particles per column (clamped to 1..=40)
        #[arg(long, default_value_t = 4)]
        size_y: usize,
        /// Fail when Newton does not converge instead of accepting the last iterate
        #[arg(long)]
        strict: bool,
        /// Record and log wall-clock step timings
        #[arg(long)]
        timing: bool,
    },
    /// Compare a system's analytic Jacobian with central differences
    CheckJacobian {
        /// oscillator, planet or cloth
        #[arg(long, default_value = "cloth")]
        system: String,
        /// Amplitude of the perturbation applied to the initial state
        #[arg(long, default_value_t = 0.05)]
        jitter: f64,
        /// Finite-difference step
        #[arg(long, default_value_t = 1e-6)]
        epsilon: f64,
        /// Use one-sided forward differences instead of central ones
        #[arg(long)]
        forward: bool,
    },
    /// Integrate one period of the circular planet orbit and report drift
    Orbit {
        /// Integrator name
        #[arg(long, default_value = "rk4")]
        integrator: String,
        /// Step length in seconds
        #[arg(long, default_value_t = 0.01)]
        dt: f64,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            system,
            integrator,
            dt,
            steps_per_frame,
            frames,
            size_x,
            size_y,
            strict,
            timing,
        } => cmd_run(
            RunArgs {
                system: &system,
                integrator: &integrator,
                dt,
                steps_per_frame,
                frames,
                size: (size_x, size_y),
                strict,
                timing,
            },
            cli.json,
        ),
        Commands::CheckJacobian {
            system,
            jitter,
            epsilon,
            forward,
        } => cmd_check_jacobian(&system, jitter, epsilon, forward, cli.json),
        Commands::Orbit { integrator, dt } => cmd_orbit(&integrator, dt, cli.json),
    }
}

struct RunArgs<'a> {
    system: &'a str,
    integrator: &'a str,
    dt: f64,
    steps_per_frame: usize,
    frames: usize,
    size: (usize, usize),
    strict: bool,
    timing: bool,
}

#[derive(Serialize)]
struct RunReport {
    summary: SessionSummary,
    total_steps: usize,
    newton_iterations: usize,
    unconverged_steps: usize,
    last_frame: Option<FrameStats>,
    bounding_box: Option<([f64; 3], [f64; 3])>,
}

fn cmd_run(args: RunArgs<'_>, json: bool) -> AppResult<()> {
    if args.timing {
        timing::enable_timing();
        step_timing::reset_all();
    }

    let kind: SystemKind = args.system.parse()?;
    let integrator: IntegratorType = args.integrator.parse()?;

    let mut session = Session::new(kind)?;
    if kind == SystemKind::Cloth {
        session.set_cloth_size(args.size.0, args.size.1)?;
    }
    session.set_integrator(integrator);
    session.set_step_length(args.dt)?;
    session.set_steps_per_frame(args.steps_per_frame);
    if args.strict {
        session.set_newton(NewtonConfig {
            policy: ConvergencePolicy::Strict,
            ..NewtonConfig::default()
        });
    }

    let mut total_steps = 0;
    let mut newton_iterations = 0;
    let mut unconverged_steps = 0;
    let mut last_frame = None;
    for _ in 0..args.frames {
        let stats = session.advance_frame()?;
        total_steps += stats.steps;
        newton_iterations += stats.newton_iterations;
        unconverged_steps += stats.unconverged_steps;
        last_frame = Some(stats);
    }

    let report = RunReport {
        summary: session.summary(),
        total_steps,
        newton_iterations,
        unconverged_steps,
        last_frame,
        bounding_box: bounding_box(&session.snapshot().positions),
    };

    if json {
        print_json(&report)?;
    } else {
        let s = &report.summary;
        println!("System:      {} ({} particles, {} pinned)", s.system, s.particles, s.pinned);
        println!("Integrator:  {}", s.integrator);
        println!(
            "Steps:       {} frames x {} steps, dt = {:e} s",
            s.frames, s.steps_per_frame, s.dt
        );
        println!("Sim time:    {:.6} s", s.time);
        if integrator.is_implicit() {
            println!(
                "Newton:      {} iterations, {} unconverged steps",
                report.newton_iterations, report.unconverged_steps
            );
        }
        if let Some((min, max)) = report.bounding_box {
            println!(
                "Bounds:      [{:.4}, {:.4}, {:.4}] .. [{:.4}, {:.4}, {:.4}]",
                min[0], min[1], min[2], max[0], max[1], max[2]
            );
        }
        if let Some(avg) = s.average_frame_seconds {
            println!("Frame time:  {:.3} ms average", avg * 1e3);
        }
    }

    if args.timing {
        step_timing::log_summary();
    }
    Ok(())
}

fn bounding_box(positions: &[[f64; 3]]) -> Option<([f64; 3], [f64; 3])> {
    let (first, rest) = positions.split_first()?;
    let mut min = *first;
    let mut max = *first;
    for p in rest {
        for k in 0..3 {
            min[k] = min[k].min(p[k]);
            max[k] = max[k].max(p[k]);
        }
    }
    Some((min, max))
}

#[derive(Serialize)]
struct JacobianReport {
    system: SystemKind,
    scheme: &'static str,
    dof: usize,
    nonzeros: usize,
    max_relative_error: f64,
}

/// Compare the analytic Jacobian of `kind` against a difference quotient at a
/// perturbed copy of its initial state.
fn check_jacobian(
    kind: SystemKind,
    jitter: f64,
    epsilon: f64,
    forward: bool,
) -> AppResult<JacobianReport> {
    let session = Session::new(kind)?;
    let sys = session.system();

    // deterministic perturbation so springs are off their rest lengths
    let state = DVector::from_fn(sys.dof(), |i, _| {
        sys.state()[i] + jitter * (1.7 * i as f64 + 0.3).sin()
    });

    let analytic = sys.eval_jacobian(&state)?;
    let f = |x: &DVector<f64>| {
        sys.eval_derivative(x).map_err(|e| SolverError::Numeric {
            what: e.to_string(),
        })
    };
    let (scheme, numeric) = if forward {
        ("forward", finite_difference_jacobian(&state, f, epsilon)?)
    } else {
        ("central", central_difference_jacobian(&state, f, epsilon)?)
    };

    Ok(JacobianReport {
        system: kind,
        scheme,
        dof: sys.dof(),
        nonzeros: analytic.nnz(),
        max_relative_error: max_relative_error(&analytic.to_dense(), &numeric),
    })
}

fn cmd_check_jacobian(
    system: &str,
    jitter: f64,
    epsilon: f64,
    forward: bool,
    json: bool,
) -> AppResult<()> {
    let kind: SystemKind = system.parse()?;
    let report = check_jacobian(kind, jitter, epsilon, forward)?;

    if json {
        print_json(&report)?;
    } else {
        println!("System:              {}", report.system);
        println!("Differences:         {}", report.scheme);
        println!("State size:          {}", report.dof);
        println!("Stored triplets:     {}", report.nonzeros);
        println!("Max relative error:  {:.3e}", report.max_relative_error);
    }
    Ok(())
}

#[derive(Serialize)]
struct OrbitReport {
    integrator: String,
    dt: f64,
    steps: usize,
    period: f64,
    final_radius: f64,
    max_radial_drift: f64,
}

fn cmd_orbit(integrator: &str, dt: f64, json: bool) -> AppResult<()> {
    let integrator: IntegratorType = integrator.parse()?;
    if !(dt.is_finite() && dt > 0.0) {
        return Err(AppError::InvalidArg(format!("dt must be positive, got {dt}")));
    }

    let params = PlanetParams::default();
    let mut planet = Planet::new(params)?;
    let r0 = planet.distance();
    let period = params.orbital_period();
    let steps = (period / dt).round() as usize;
    let newton = NewtonConfig::default();

    let mut max_drift: f64 = 0.0;
    for _ in 0..steps {
        integrator.step(&mut planet, dt, &newton)?;
        max_drift = max_drift.max((planet.distance() - r0).abs() / r0);
    }

    let report = OrbitReport {
        integrator: integrator.label().to_string(),
        dt,
        steps,
        period,
        final_radius: planet.distance(),
        max_radial_drift: max_drift,
    };

    if json {
        print_json(&report)?;
    } else {
        println!("Integrator:        {}", report.integrator);
        println!("Steps:             {} x {} s (period {:.4} s)", report.steps, report.dt, report.period);
        println!("Final radius:      {:.6}", report.final_radius);
        println!("Max radial drift:  {:.3}%", report.max_radial_drift * 100.0);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Output(e.to_string()))?;
    println!("{text}");
    Ok(())
}
