#[cfg(not(feature = "streaming"))]
fn main() {
    eprintln!(
        "The vgmopl CLI requires the \"streaming\" feature. Rebuild with `--features streaming` to enable playback."
    );
}

#[cfg(feature = "streaming")]
mod cli {
    use std::env;
    use std::fs;
    use std::io::{self, Read, Write};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use anyhow::Context;
    use parking_lot::Mutex;

    use vgmopl::chip::NullOpl;
    use vgmopl::streaming::{
        AudioDevice, RealtimePlayer, StreamConfig, DEFAULT_SAMPLE_RATE, VISUALIZATION_UPDATE_MS,
    };
    use vgmopl::visualization::{render_register_dump, Line};
    use vgmopl::PlaybackSession;

    /// Samples generated per producer batch
    const PRODUCER_BATCH: usize = 1024;

    fn usage() {
        eprintln!(
            "Usage:\n  vgmopl <file.vgm>\n\nFlags:\n  -h, --help           Show this help\n\nKeys during playback:\n  q                    Quit\n"
        );
    }

    #[cfg(unix)]
    fn set_raw_terminal_mode(enable: bool) {
        let (echo, raw) = if enable { ("-echo", "raw") } else { ("echo", "-raw") };
        let _ = std::process::Command::new("stty").arg(echo).arg(raw).status();
    }

    #[cfg(not(unix))]
    fn set_raw_terminal_mode(_enable: bool) {}

    /// Write one dump frame with ANSI emphasis, cursor parked at home
    fn draw_lines(out: &mut impl Write, lines: &[Line], status: &str) -> io::Result<()> {
        write!(out, "\x1B[H\x1B[2K\r{status}\r\n")?;
        for line in lines {
            write!(out, "\x1B[2K\r")?;
            for span in line {
                if span.bright {
                    write!(out, "\x1B[1m{}\x1B[0m", span.text)?;
                } else {
                    write!(out, "\x1B[2m{}\x1B[0m", span.text)?;
                }
            }
            write!(out, "\r\n")?;
        }
        write!(out, "\x1B[J")?;
        out.flush()
    }

    pub fn run() -> anyhow::Result<()> {
        let mut file_arg: Option<String> = None;
        for arg in env::args().skip(1) {
            match arg.as_str() {
                "--help" | "-h" => {
                    usage();
                    return Ok(());
                }
                _ if arg.starts_with('-') => {
                    eprintln!("Unknown flag: {}", arg);
                    usage();
                    return Ok(());
                }
                _ => file_arg = Some(arg),
            }
        }

        let Some(file_path) = file_arg else {
            usage();
            return Ok(());
        };

        // The whole file is buffered up front; the real-time path never
        // touches the filesystem
        let data = fs::read(&file_path)
            .with_context(|| format!("failed to read file '{}'", file_path))?;

        let session = PlaybackSession::new(data, Box::new(NullOpl))?;
        let chip_kind = session.chip().kind();
        let bounds = session.bounds();

        println!("Playing {}...", file_path);
        println!("  Chip:  {}", session.chip().kind());
        println!(
            "  Data:  {}..{} ({} bytes)",
            bounds.data_start,
            bounds.eof_offset,
            bounds.eof_offset - bounds.data_start
        );
        if bounds.has_loop {
            println!("  Loop:  offset {}", bounds.loop_offset);
        } else {
            println!("  Loop:  none (restarts with full reset)");
        }

        let config = StreamConfig::low_latency(DEFAULT_SAMPLE_RATE);
        let streamer = Arc::new(RealtimePlayer::new(config)?);
        let audio_device =
            AudioDevice::new(config.sample_rate, config.channels, streamer.get_buffer())?;

        println!(
            "  Audio: {} Hz, {:.1}ms buffer\n",
            config.sample_rate,
            config.latency_ms()
        );

        let session = Arc::new(Mutex::new(session));
        let running = Arc::new(AtomicBool::new(true));

        let producer_session = Arc::clone(&session);
        let producer_running = Arc::clone(&running);
        let producer_streamer = Arc::clone(&streamer);
        let producer_thread = std::thread::spawn(move || {
            while producer_running.load(Ordering::Relaxed) {
                let samples = {
                    let mut session = producer_session.lock();
                    session.generate_samples(PRODUCER_BATCH)
                };
                producer_streamer.write_blocking(&samples);
            }
        });

        // Raw-mode stdin reader so single keys arrive without Enter
        let (tx, rx) = std::sync::mpsc::channel::<u8>();
        let input_running = Arc::new(AtomicBool::new(true));
        let input_running_reader = Arc::clone(&input_running);
        std::thread::spawn(move || {
            set_raw_terminal_mode(true);
            let mut stdin = io::stdin();
            let mut buf = [0u8; 1];
            while input_running_reader.load(Ordering::Relaxed) {
                if stdin.read_exact(&mut buf).is_ok() {
                    let _ = tx.send(buf[0]);
                    if buf[0] == b'\x03' {
                        break;
                    }
                }
            }
            set_raw_terminal_mode(false);
        });

        print!("\x1B[?25l\x1B[2J");
        let mut stdout = io::stdout();

        while running.load(Ordering::Relaxed) {
            std::thread::sleep(std::time::Duration::from_millis(VISUALIZATION_UPDATE_MS));

            while let Ok(key) = rx.try_recv() {
                match key {
                    b'q' | b'Q' | b'\x03' => running.store(false, Ordering::Relaxed),
                    _ => {}
                }
            }

            let (shadow, position, samples_generated) = {
                let session = session.lock();
                (
                    session.shadow_snapshot(),
                    session.position(),
                    session.samples_generated(),
                )
            };

            let status = format!(
                "{} | {}/{} | {:.1}s | buffer {:>5.1}% | [q] quit",
                chip_kind,
                position,
                bounds.eof_offset,
                samples_generated as f64 / config.sample_rate as f64,
                streamer.fill_percentage() * 100.0,
            );
            let lines = render_register_dump(&shadow, chip_kind);
            draw_lines(&mut stdout, &lines, &status)?;
        }

        // Shutdown: stop the producer, let the device drain out
        running.store(false, Ordering::Relaxed);
        input_running.store(false, Ordering::Relaxed);
        if producer_thread.join().is_err() {
            log::error!("producer thread panicked during shutdown");
        }
        audio_device.finish();

        set_raw_terminal_mode(false);
        print!("\x1B[?25h");
        stdout.flush().ok();

        let stats = streamer.get_stats();
        println!(
            "\nStopped after {:.1}s ({} samples, {} overruns)",
            stats.samples_played as f64 / config.sample_rate as f64,
            stats.samples_played,
            stats.overrun_count
        );

        Ok(())
    }
}

#[cfg(feature = "streaming")]
fn main() {
    env_logger::init();

    if let Err(err) = cli::run() {
        // Device acquisition is the only failure with a distinct exit code;
        // usage and format problems report a diagnostic and exit cleanly
        if matches!(
            err.downcast_ref::<vgmopl::VgmError>(),
            Some(vgmopl::VgmError::AudioDevice(_))
        ) {
            eprintln!("Error: {err:#}");
            std::process::exit(2);
        }
        eprintln!("{err:#}");
    }
}
