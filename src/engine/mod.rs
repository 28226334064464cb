/// SPI master bit engine, evaluated one reference-clock tick at a time
///
/// A byte transfer on the wire looks like this:
/// - the serial clock rests at its idle level (CPOL: 0 = idle low,
///   1 = idle high)
/// - each of the 8 bits occupies one full serial-clock cycle, i.e. two
///   edges: the "leading" edge (first transition away from idle) and
///   the "trailing" edge (transition back)
/// - bits go out most-significant-bit first on MOSI, and come in
///   most-significant-bit first on MISO
///
/// CPHA picks which edge carries data:
/// - CPHA = 0: the first outbound bit is put on MOSI when the byte is
///   loaded (before any edge), further bits on trailing edges; MISO is
///   sampled on leading edges
/// - CPHA = 1: outbound bits are put on MOSI on leading edges; MISO is
///   sampled on trailing edges
///
/// Either way a byte takes exactly 16 edges, 8 drives and 8 samples.
///
/// The serial clock is derived from the reference clock by counting
/// reference ticks per half serial-clock cycle; the reference clock
/// must therefore run at least twice as fast (half period >= 2).

mod bit;
mod mode;

pub use self::bit::{
	BitEngine,
	BitInputs,
	BitOutputs,
	Config,
};

pub use self::mode::Mode;
