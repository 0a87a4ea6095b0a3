//! eUSCI_A (UART mode) register layout, bit definitions and baud tables.

use core::fmt;

use bitflags::bitflags;

// ---------------------------------------------------------------------------
// Register offsets
// ---------------------------------------------------------------------------

/// Register offsets in bytes from the eUSCI_A base address. All registers
/// are 16 bits wide.
pub mod offset {
    /// Control word 0.
    pub const CTLW0: usize = 0x00;
    /// Control word 1 (deglitch time).
    pub const CTLW1: usize = 0x02;
    /// Baud rate control word (prescaler).
    pub const BRW: usize = 0x06;
    /// Modulation control word.
    pub const MCTLW: usize = 0x08;
    /// Status word.
    pub const STATW: usize = 0x0A;
    /// Receive buffer. Reading it clears `UCRXIFG` and the error flags.
    pub const RXBUF: usize = 0x0C;
    /// Transmit buffer. Writing it clears `UCTXIFG`.
    pub const TXBUF: usize = 0x0E;
    /// Interrupt enable.
    pub const IE: usize = 0x1A;
    /// Interrupt flags.
    pub const IFG: usize = 0x1C;
    /// Interrupt vector. Reading it clears the highest-priority pending flag.
    pub const IV: usize = 0x1E;
}

// ---------------------------------------------------------------------------
// Bitflag types
// ---------------------------------------------------------------------------

bitflags! {
    /// Control word 0 bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ctlw0: u16 {
        /// Software reset. The state machine is held in reset while set.
        const SWRST       = 1 << 0;
        /// Transmit break.
        const TXBRK       = 1 << 1;
        /// Transmit address.
        const TXADDR      = 1 << 2;
        /// Dormant (multiprocessor modes).
        const DORM        = 1 << 3;
        /// Receive break interrupt enable.
        const BRKIE       = 1 << 4;
        /// Receive erroneous-character interrupt enable.
        const RXEIE       = 1 << 5;
        /// Clock source select, ACLK.
        const SSEL_ACLK   = 0b01 << 6;
        /// Clock source select, SMCLK.
        const SSEL_SMCLK  = 0b10 << 6;
        /// Synchronous mode enable. Clear for UART.
        const SYNC        = 1 << 8;
        /// Two stop bits.
        const SPB         = 1 << 11;
        /// 7-bit character length.
        const SEVEN_BIT   = 1 << 12;
        /// MSB first.
        const MSB         = 1 << 13;
        /// Even parity (with `PEN`).
        const PAR         = 1 << 14;
        /// Parity enable.
        const PEN         = 1 << 15;

        /// Both clock select bits.
        const SSEL_MASK   = Self::SSEL_ACLK.bits() | Self::SSEL_SMCLK.bits();
    }
}

bitflags! {
    /// Status word bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Statw: u16 {
        /// A transmit or receive operation is in progress.
        const BUSY        = 1 << 0;
        /// Idle line / address detected.
        const ADDR_IDLE   = 1 << 1;
        /// Receive error: set whenever any of `FE`, `PE` or `OE` is set.
        const RXERR       = 1 << 2;
        /// Break detected.
        const BRK         = 1 << 3;
        /// Parity error.
        const PE          = 1 << 4;
        /// Overrun: a character arrived before RXBUF was read.
        const OE          = 1 << 5;
        /// Framing error: low stop bit.
        const FE          = 1 << 6;
        /// Loopback mode.
        const LISTEN      = 1 << 7;
    }
}

bitflags! {
    /// Interrupt enable bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ie: u16 {
        /// Receive interrupt enable.
        const RX          = 1 << 0;
        /// Transmit interrupt enable.
        const TX          = 1 << 1;
        /// Start bit interrupt enable.
        const START       = 1 << 2;
        /// Transmit complete interrupt enable.
        const TX_COMPLETE = 1 << 3;
    }
}

bitflags! {
    /// Interrupt flag bits (same layout as [`Ie`]).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ifg: u16 {
        /// A complete character is in RXBUF.
        const RX          = 1 << 0;
        /// TXBUF is empty and can take the next character.
        const TX          = 1 << 1;
        /// Start bit received.
        const START       = 1 << 2;
        /// The shift register has emptied.
        const TX_COMPLETE = 1 << 3;
    }
}

// ---------------------------------------------------------------------------
// Interrupt vector
// ---------------------------------------------------------------------------

/// Decoded value of the interrupt vector register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum IntVector {
    /// Receive buffer full.
    RxReady = 0x02,
    /// Transmit buffer empty.
    TxReady = 0x04,
    /// Start bit received.
    StartBit = 0x06,
    /// Transmission complete.
    TxComplete = 0x08,
}

impl IntVector {
    /// Decodes a raw IV value. Returns `None` for 0 (nothing pending) and
    /// for values the peripheral does not define.
    #[must_use]
    pub const fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0x02 => Some(Self::RxReady),
            0x04 => Some(Self::TxReady),
            0x06 => Some(Self::StartBit),
            0x08 => Some(Self::TxComplete),
            _ => None,
        }
    }

    /// The raw register value.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self as u16
    }
}

// ---------------------------------------------------------------------------
// Clocking and baud rates
// ---------------------------------------------------------------------------

/// Clock feeding the baud rate generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockSource {
    /// 32768 Hz watch crystal. Only 9600 baud is supported.
    Aclk,
    /// 8 MHz sub-main clock.
    Smclk,
}

impl ClockSource {
    /// Nominal clock frequency.
    #[must_use]
    pub const fn hz(self) -> u32 {
        match self {
            Self::Aclk => 32_768,
            Self::Smclk => 8_000_000,
        }
    }

    /// The `UCSSEL` bits selecting this clock in [`Ctlw0`].
    #[must_use]
    pub const fn select_bits(self) -> Ctlw0 {
        match self {
            Self::Aclk => Ctlw0::SSEL_ACLK,
            Self::Smclk => Ctlw0::SSEL_SMCLK,
        }
    }
}

impl fmt::Display for ClockSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aclk => f.write_str("ACLK"),
            Self::Smclk => f.write_str("SMCLK"),
        }
    }
}

/// The closed set of supported baud rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaudRate {
    /// 9600 baud.
    Baud9600,
    /// 19200 baud.
    Baud19200,
    /// 38400 baud.
    Baud38400,
    /// 57600 baud.
    Baud57600,
    /// 115200 baud.
    Baud115200,
}

impl BaudRate {
    /// Every supported rate, slowest first.
    pub const ALL: [Self; 5] = [
        Self::Baud9600,
        Self::Baud19200,
        Self::Baud38400,
        Self::Baud57600,
        Self::Baud115200,
    ];

    /// Bits per second.
    #[must_use]
    pub const fn bps(self) -> u32 {
        match self {
            Self::Baud9600 => 9_600,
            Self::Baud19200 => 19_200,
            Self::Baud38400 => 38_400,
            Self::Baud57600 => 57_600,
            Self::Baud115200 => 115_200,
        }
    }

    /// Looks up a rate by its bits-per-second value.
    #[must_use]
    pub const fn from_bps(bps: u32) -> Option<Self> {
        match bps {
            9_600 => Some(Self::Baud9600),
            19_200 => Some(Self::Baud19200),
            38_400 => Some(Self::Baud38400),
            57_600 => Some(Self::Baud57600),
            115_200 => Some(Self::Baud115200),
            _ => None,
        }
    }

    /// Divisor settings for this rate on the given clock, or `None` if the
    /// clock cannot generate it.
    ///
    /// Values follow the eUSCI "recommended settings for typical crystals
    /// and baud rates" table.
    #[must_use]
    pub const fn divisors(self, clock: ClockSource) -> Option<Divisors> {
        match (clock, self) {
            (ClockSource::Aclk, Self::Baud9600) => Some(Divisors::low_frequency(3, 0x92)),
            (ClockSource::Aclk, _) => None,
            (ClockSource::Smclk, Self::Baud9600) => Some(Divisors::oversampled(52, 1, 0x49)),
            (ClockSource::Smclk, Self::Baud19200) => Some(Divisors::oversampled(26, 0, 0xB6)),
            (ClockSource::Smclk, Self::Baud38400) => Some(Divisors::oversampled(13, 0, 0x84)),
            (ClockSource::Smclk, Self::Baud57600) => Some(Divisors::oversampled(8, 10, 0xF7)),
            (ClockSource::Smclk, Self::Baud115200) => Some(Divisors::oversampled(4, 5, 0x55)),
        }
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bps())
    }
}

/// Values for the BRW and MCTLW registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Divisors {
    /// Clock prescaler (`UCBRx`).
    pub brw: u16,
    /// Modulation control word (`UCBRSx`, `UCBRFx`, `UCOS16`).
    pub mctlw: u16,
}

impl Divisors {
    /// `UCOS16` bit in MCTLW.
    const OS16: u16 = 1 << 0;

    /// Settings with 16x oversampling (`UCOS16 = 1`).
    #[must_use]
    pub const fn oversampled(br: u16, brf: u8, brs: u8) -> Self {
        Self {
            brw: br,
            mctlw: ((brs as u16) << 8) | (((brf & 0x0F) as u16) << 4) | Self::OS16,
        }
    }

    /// Settings in low-frequency mode (`UCOS16 = 0`).
    #[must_use]
    pub const fn low_frequency(br: u16, brs: u8) -> Self {
        Self {
            brw: br,
            mctlw: (brs as u16) << 8,
        }
    }
}
