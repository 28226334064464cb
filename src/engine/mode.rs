use std::fmt;

/// One of the four SPI clock modes, encoded as `CPOL << 1 | CPHA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mode {
	Mode0,
	Mode1,
	Mode2,
	Mode3,
}

impl Mode {
	pub const ALL: [Mode; 4] = [Mode::Mode0, Mode::Mode1, Mode::Mode2, Mode::Mode3];

	pub fn from_index(index: u8) -> crate::AResult<Mode> {
		match index {
			0 => Ok(Mode::Mode0),
			1 => Ok(Mode::Mode1),
			2 => Ok(Mode::Mode2),
			3 => Ok(Mode::Mode3),
			_ => bail!("invalid SPI mode {} (must be 0-3)", index),
		}
	}

	pub fn index(self) -> u8 {
		match self {
			Mode::Mode0 => 0,
			Mode::Mode1 => 1,
			Mode::Mode2 => 2,
			Mode::Mode3 => 3,
		}
	}

	/// clock polarity: idle level of the serial clock
	pub fn cpol(self) -> bool {
		0 != self.index() & 0b10
	}

	/// clock phase: set = drive on leading edges, sample on trailing
	/// edges; clear = drive on load + trailing edges, sample on leading
	/// edges
	pub fn cpha(self) -> bool {
		0 != self.index() & 0b01
	}

	pub fn idle_level(self) -> bool {
		self.cpol()
	}
}

impl fmt::Display for Mode {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "mode {} (CPOL={}, CPHA={})",
			self.index(),
			self.cpol() as u8,
			self.cpha() as u8,
		)
	}
}
