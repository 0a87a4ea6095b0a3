//! pion-term: the UART driver on a simulated peripheral.
//!
//! Two threads stand in for the firmware's two execution contexts. The
//! hardware thread owns stdin and stdout: it puts input bytes on the
//! simulated RX pin, clocks transmitted bytes out to stdout, and calls the
//! port's interrupt entry point whenever an enabled flag is raised. The
//! main thread runs the cooperative main loop, echoing each completed line.

mod cli;

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use pion_core::config::{DEFAULT_RX_CAPACITY, DEFAULT_TX_CAPACITY};
use pion_core::log::{self, LogLevel};
use pion_core::{pdebug, pinfo, ptrace, pwarn};
use pion_uart::rx::{CR, LF};
use pion_uart::sim::SimUart;
use pion_uart::{
    BaudRate, Event, IrqTx, LineAssembler, PolledTx, PortStats, RingReceiver, RxHandler,
    SerialConfig, SerialPort, TxPath, UartHw,
};

use cli::{Policy, TxMode};

/// How long the hardware thread waits for the main loop to consume a line
/// before it sends the next one anyway.
const LINE_TIMEOUT: Duration = Duration::from_millis(250);

fn stderr_log(level: LogLevel, args: std::fmt::Arguments<'_>) {
    eprintln!("[{}] {args}", level.name());
}

fn stderr_print(args: std::fmt::Arguments<'_>) {
    eprint!("{args}");
}

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    log::set_log_level(cli.log_level());
    log::set_log_fn(stderr_log);
    log::set_print_fn(stderr_print);

    let baud = BaudRate::from_bps(cli.baud).ok_or_else(|| {
        let supported: Vec<String> = BaudRate::ALL.iter().map(ToString::to_string).collect();
        anyhow!(
            "unsupported baud rate {} (supported: {})",
            cli.baud,
            supported.join(", ")
        )
    })?;
    let config = SerialConfig::new()
        .with_baud(baud)
        .with_clock(cli.clock.into());
    pinfo!("pion-term: {:?} receive, {:?} transmit", cli.policy, cli.tx);

    let sim = SimUart::new();
    let stats = match (cli.tx, cli.policy) {
        (TxMode::Irq, Policy::Line) => run(
            &sim,
            &SerialPort::new(
                &sim,
                IrqTx::<DEFAULT_TX_CAPACITY>::new(),
                LineAssembler::<DEFAULT_RX_CAPACITY>::new(),
            ),
            &config,
        ),
        (TxMode::Irq, Policy::Ring) => run(
            &sim,
            &SerialPort::new(
                &sim,
                IrqTx::<DEFAULT_TX_CAPACITY>::new(),
                RingReceiver::<DEFAULT_RX_CAPACITY>::new(),
            ),
            &config,
        ),
        (TxMode::Polled, Policy::Line) => run(
            &sim,
            &SerialPort::new(
                &sim,
                PolledTx::new(),
                LineAssembler::<DEFAULT_RX_CAPACITY>::new(),
            ),
            &config,
        ),
        (TxMode::Polled, Policy::Ring) => run(
            &sim,
            &SerialPort::new(
                &sim,
                PolledTx::new(),
                RingReceiver::<DEFAULT_RX_CAPACITY>::new(),
            ),
            &config,
        ),
    }?;

    pinfo!("{stats}");
    if sim.tx_overwrites() > 0 || sim.wire_dropped() > 0 {
        pwarn!(
            "simulator: {} overwritten, {} dropped on the wire",
            sim.tx_overwrites(),
            sim.wire_dropped()
        );
    }
    Ok(())
}

/// Shutdown handshake between the two threads.
#[derive(Default)]
struct Flags {
    /// stdin is exhausted and the last line has been delivered.
    input_done: AtomicBool,
    /// The main loop has flushed its output and exited.
    main_done: AtomicBool,
}

/// Main-loop side of a receive policy: collects completed lines.
trait Lines {
    fn take_lines(&self, partial: &mut Vec<u8>, out: &mut Vec<Vec<u8>>);
}

impl<H: UartHw, T: TxPath, const N: usize> Lines for SerialPort<H, T, LineAssembler<N>> {
    fn take_lines(&self, _partial: &mut Vec<u8>, out: &mut Vec<Vec<u8>>) {
        if let Some(line) = self.completed_line() {
            out.push(line.as_bytes().to_vec());
        }
        self.rearm();
    }
}

impl<H: UartHw, T: TxPath, const N: usize> Lines for SerialPort<H, T, RingReceiver<N>> {
    fn take_lines(&self, partial: &mut Vec<u8>, out: &mut Vec<Vec<u8>>) {
        while let Some(byte) = self.read_byte() {
            match byte {
                CR => out.push(std::mem::take(partial)),
                LF => {}
                _ => partial.push(byte),
            }
        }
    }
}

fn run<'a, T, R>(
    sim: &'a SimUart,
    port: &SerialPort<&'a SimUart, T, R>,
    config: &SerialConfig,
) -> Result<PortStats>
where
    T: TxPath + Sync,
    R: RxHandler + Sync,
    SerialPort<&'a SimUart, T, R>: Lines,
{
    port.init(config).context("initialising the serial port")?;

    let (ack_tx, ack_rx) = mpsc::channel();
    let flags = Flags::default();

    thread::scope(|s| {
        let flags = &flags;
        let hw = s.spawn(move || hardware(sim, port, &ack_rx, flags));

        main_loop(port, &ack_tx, flags);
        flags.main_done.store(true, Ordering::Release);

        hw.join()
            .map_err(|_| anyhow!("hardware thread panicked"))
            .and_then(|result| result)
    })?;

    Ok(port.stats())
}

/// The firmware's cooperative main loop.
fn main_loop<H, T, R>(port: &SerialPort<H, T, R>, acks: &mpsc::Sender<()>, flags: &Flags)
where
    H: UartHw,
    T: TxPath,
    R: RxHandler,
    SerialPort<H, T, R>: Lines,
{
    let mut partial = Vec::new();
    let mut lines = Vec::new();
    let mut overruns = 0;

    loop {
        let input_done = flags.input_done.load(Ordering::Acquire);
        let events = port.take_event();

        if events.contains(Event::RX) {
            port.take_lines(&mut partial, &mut lines);
            for line in lines.drain(..) {
                pdebug!("rx: {} byte line", line.len());
                port.send(&line);
                port.send(b"\r\n");
                // The hardware thread may have given up waiting already.
                let _ = acks.send(());
            }
        }
        if events.contains(Event::TX) {
            ptrace!("tx: drained");
        }

        let stats = port.stats();
        if stats.rx_overruns != overruns {
            pwarn!("rx: {} byte(s) overrun", stats.rx_overruns - overruns);
            overruns = stats.rx_overruns;
        }

        if events.is_empty() {
            if input_done {
                break;
            }
            thread::yield_now();
        }
    }

    port.flush();
}

/// The simulated peripheral plus its interrupt line.
fn hardware<T: TxPath, R: RxHandler>(
    sim: &SimUart,
    port: &SerialPort<&SimUart, T, R>,
    acks: &mpsc::Receiver<()>,
    flags: &Flags,
) -> Result<()> {
    let mut stdout = io::stdout().lock();

    for line in io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        for &byte in line.as_bytes().iter().chain(b"\r\n") {
            sim.inject_rx(byte);
            pump(sim, port, &mut stdout)?;
        }

        let deadline = Instant::now() + LINE_TIMEOUT;
        while acks.try_recv().is_err() && Instant::now() < deadline {
            pump(sim, port, &mut stdout)?;
            thread::yield_now();
        }
    }

    flags.input_done.store(true, Ordering::Release);
    while !flags.main_done.load(Ordering::Acquire) {
        pump(sim, port, &mut stdout)?;
        thread::yield_now();
    }
    pump(sim, port, &mut stdout)?;
    Ok(())
}

/// Clocks out the byte in flight, runs the interrupt handler while a flag is
/// pending, and copies the wire to `out`.
fn pump<T: TxPath, R: RxHandler>(
    sim: &SimUart,
    port: &SerialPort<&SimUart, T, R>,
    out: &mut impl Write,
) -> io::Result<()> {
    sim.complete_tx();
    sim.service(|| port.on_interrupt());

    let mut wrote = false;
    while let Some(byte) = sim.wire_byte() {
        out.write_all(&[byte])?;
        wrote = true;
    }
    if wrote {
        out.flush()?;
    }
    Ok(())
}
