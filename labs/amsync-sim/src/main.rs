use std::f64::consts::PI;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;

use amsync_dsp::channel::Awgn;
use amsync_dsp::design::{FllDesign, LoopDesign, LoopOrder};
use amsync_dsp::detector::DetectorKind;
use amsync_dsp::filter::{LoopFilter, LoopFilterConfig};
use amsync_dsp::math::Real;
use amsync_dsp::wave::Tone;
use amsync_dsp::{NumericFormat, Pll, PllConfig, ReferencePll, SineTable};
use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum};
use hound::{WavSpec, WavWriter};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Filter {
    First,
    Second,
    Third,
    Fll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Detector {
    Rational,
    Cordic,
    Exact,
}

/// Run the fixed-point carrier loop against a synthetic carrier and write a
/// trace of it to a WAV file.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Sample rate in Hz
    #[arg(long, default_value_t = 15000.0)]
    sample_rate: f64,

    /// Loop bandwidth in Hz
    #[arg(short, long, default_value_t = 30.0)]
    bandwidth: f64,

    #[arg(short, long, value_enum, default_value_t = Filter::Third)]
    filter: Filter,

    #[arg(short, long, value_enum, default_value_t = Detector::Rational)]
    detector: Detector,

    /// CORDIC iterations
    #[arg(long, default_value_t = 6)]
    iterations: u32,

    /// FLL pull-in range in Hz
    #[arg(long, default_value_t = 200.0)]
    pull_in: f64,

    /// Fractional bits of the loop filter coefficients
    #[arg(long, default_value_t = 20)]
    filter_bits: u32,

    /// Initial carrier offset in Hz
    #[arg(short, long, default_value_t = 50.0, allow_hyphen_values = true)]
    offset: f64,

    /// Carrier sweep in Hz per second
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    sweep: f64,

    /// Carrier amplitude relative to full scale
    #[arg(short, long, default_value_t = 0.1)]
    amplitude: f64,

    /// Standard deviation of the added noise, relative to full scale
    #[arg(short, long, default_value_t = 0.0)]
    noise: f64,

    /// Seconds between phase jumps (0 disables them)
    #[arg(long, default_value_t = 1.0)]
    step_every: f64,

    /// Size of each phase jump in radians
    #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
    step: f64,

    /// Length of the run in seconds
    #[arg(short, long, default_value_t = 4.0)]
    seconds: f64,

    /// Seed for the noise generator
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Trace output
    #[arg(long, default_value = "amsync-sim.wav")]
    output: PathBuf,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .try_init();

    let format = NumericFormat {
        filter_bits: args.filter_bits,
        ..NumericFormat::default()
    };
    let scaling = format.scaling()?;

    let order = match args.filter {
        Filter::First => Some(LoopOrder::First),
        Filter::Second => Some(LoopOrder::Second),
        Filter::Third => Some(LoopOrder::Third),
        Filter::Fll => None,
    };
    let design = order.map(|order| LoopDesign {
        sample_rate: args.sample_rate,
        loop_bandwidth: args.bandwidth,
        order,
    });
    let filter = match &design {
        Some(design) => design.filter_config(&format)?,
        None => FllDesign {
            sample_rate: args.sample_rate,
            loop_bandwidth: args.bandwidth,
            pull_in: args.pull_in,
        }
        .filter_config(&format)?,
    };
    match &filter {
        LoopFilterConfig::Iir(c) => {
            info!(b = ?c.b(), feedback = ?c.feedback(), "quantized loop filter")
        }
        LoopFilterConfig::Fll(c) => info!(
            alpha = c.alpha(),
            beta = c.beta(),
            freq_max = c.freq_max(),
            "quantized FLL"
        ),
    }

    let detector = match args.detector {
        Detector::Rational => DetectorKind::Rational,
        Detector::Cordic => DetectorKind::Cordic {
            iterations: args.iterations,
        },
        Detector::Exact => DetectorKind::Exact,
    };
    let config = PllConfig {
        format,
        detector,
        ..PllConfig::new(filter)
    };
    let table = Arc::new(SineTable::new(&format)?);
    let mut pll = Pll::new(config, table)?;
    let mut reference = design.as_ref().map(ReferencePll::new).transpose()?;
    if reference.is_none() {
        debug!("no floating-point reference for the FLL");
    }

    let fs = args.sample_rate;
    let num_samples = (args.seconds * fs).round() as usize;
    let step_interval = (args.step_every * fs).round() as usize;
    let mut tone = Tone::new((args.offset / fs) as Real, args.amplitude as Real, 0.0)
        .with_sweep((args.sweep / (fs * fs)) as Real);
    let mut noise = Awgn::with_rng(StdRng::seed_from_u64(args.seed), args.noise as Real);

    // Input I, recovered baseband I, fixed-point error, reference error.
    let num_channels = 4;
    let mut writer = WavWriter::new(
        BufWriter::new(
            File::create(&args.output)
                .with_context(|| format!("cannot create {}", args.output.display()))?,
        ),
        WavSpec {
            channels: num_channels,
            sample_rate: fs.round() as u32,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        },
    )
    .context("cannot write wav file")?;

    let full_scale_error = (scaling.detector_pi * scaling.err_scale) as f64;
    let phase_one = scaling.phase_one as f64;
    let mut locked = pll.is_locked();
    let mut worst_divergence: f64 = 0.0;
    let (mut locked_error_sq, mut locked_samples) = (0.0, 0usize);

    for n in 0..num_samples {
        if step_interval > 0 && n > 0 && n % step_interval == 0 {
            tone.step_phase(args.step as Real);
            debug!(sample = n, step = args.step, "phase jump");
        }
        let sample = tone.next() + noise.sample();
        let fixed = sample.to_fixed(scaling.sample_max);

        let out = pll.process(fixed.i, fixed.q);
        let reference_error = match reference.as_mut() {
            Some(reference) => {
                let r = reference.process(fixed.to_real(scaling.sample_max));
                let d = pll.phase() as f64 / phase_one - reference.phase();
                let d = (d + PI).rem_euclid(2.0 * PI) - PI;
                if pll.is_locked() {
                    worst_divergence = worst_divergence.max(d.abs());
                }
                r.error as f64 / PI
            }
            None => 0.0,
        };

        if pll.is_locked() != locked {
            locked = pll.is_locked();
            let time = n as f64 / fs;
            if locked {
                info!(sample = n, time, level = pll.lock_level(), "locked");
            } else {
                warn!(sample = n, time, level = pll.lock_level(), "lost lock");
            }
        }
        if locked {
            locked_error_sq += (out.error as f64 / phase_one).powi(2);
            locked_samples += 1;
        }

        for value in [
            fixed.i as f64 / 32768.0,
            out.baseband.i as f64 / 32768.0,
            out.error as f64 / full_scale_error,
            reference_error,
        ] {
            writer.write_sample((value.clamp(-1.0, 1.0) * 32767.0) as i16)?;
        }
    }
    writer.finalize()?;

    let rms = if locked_samples > 0 {
        (locked_error_sq / locked_samples as f64).sqrt()
    } else {
        f64::NAN
    };
    let frequency = match pll.filter() {
        LoopFilter::Fll(f) => Some(f.frequency() as f64 / (2.0 * scaling.phase_pi as f64) * fs),
        LoopFilter::Iir(_) => None,
    };
    info!(
        samples = num_samples,
        locked,
        locked_fraction = locked_samples as f64 / num_samples.max(1) as f64,
        rms_error_rad = rms,
        worst_divergence_rad = worst_divergence,
        fll_frequency_hz = ?frequency,
        output = %args.output.display(),
        "done"
    );
    Ok(())
}
