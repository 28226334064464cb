#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate spi_master_engine;
use spi_master_engine::*;

use std::process::exit;

use spi_master_engine::burst::{
	BurstConfig,
	BurstInputs,
	BurstOutputs,
	BurstSequencer,
};
use spi_master_engine::engine::{
	Config,
	Mode,
};

fn get_param<T>(matches: &clap::ArgMatches, name: &str, default: T) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => return Ok(default),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid parameter {}: {}", name, e);
		e.context(msg).into()
	})
}

struct Wire {
	seq: BurstSequencer,
	// MOSI looped back into MISO, delayed by one reference tick
	line: bool,
	now: u64,
	trace: bool,
}

impl Wire {
	fn tick(&mut self, reset_n: bool, load: bool, tx_byte: u8) -> BurstOutputs {
		self.now += 1;
		let out = self.seq.tick(BurstInputs {
			reset_n,
			load,
			tx_byte,
			rx_line: self.line,
		});
		self.line = out.tx_line;
		if self.trace {
			println!("tick {:6}: sck={} cs={} mosi={} ready={}{}",
				self.now,
				out.serial_clock as u8,
				out.chip_select as u8,
				out.tx_line as u8,
				out.ready as u8,
				if out.rx_valid {
					format!(" rx_valid rx_count={} rx_byte=0x{:02x}", out.rx_count, out.rx_byte)
				} else {
					String::new()
				},
			);
		}
		out
	}
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@arg mode: --mode +takes_value "SPI mode 0-3 (default 0)")
		(@arg half_period: --("half-period") +takes_value "reference ticks per half serial-clock cycle (default 4)")
		(@arg settle: --settle +takes_value "chip-select hold ticks after the burst (default 10)")
		(@arg trace: --trace "print the line state of every reference tick")
		(@arg BYTES: +required +multiple "bytes to send as one burst, hex (e.g. c1 c2)")
	).get_matches();

	let mode = Mode::from_index(get_param(&matches, "mode", 0u8)?)?;
	let half_period: u32 = get_param(&matches, "half_period", 4)?;
	let settle_ticks: u32 = get_param(&matches, "settle", 10)?;

	let mut bytes = Vec::new();
	for p in matches.values_of("BYTES").unwrap() {
		match u8::from_str_radix(p, 16) {
			Ok(b) => bytes.push(b),
			Err(e) => bail!("invalid byte {:?}: {}", p, e),
		}
	}

	let config = BurstConfig::new(
		Config::new(mode, half_period)?,
		bytes.len(),
		settle_ticks,
	)?;
	info!("{}, half period {} ticks, {} byte burst, {} settle ticks",
		config.engine().mode(),
		config.engine().half_period(),
		config.burst_length(),
		config.settle_ticks(),
	);

	let mut wire = Wire {
		seq: BurstSequencer::new(config),
		line: false,
		now: 0,
		trace: matches.is_present("trace"),
	};
	// one synchronous reset tick before use
	wire.tick(false, false, 0);

	let per_byte = config.engine().ticks_per_byte() as u64 + 4;
	let limit = wire.now + (bytes.len() as u64 + 1) * per_byte + settle_ticks as u64 + 4;

	let mut pending = bytes.iter();
	let mut next = pending.next();
	let mut received = Vec::new();

	// wait for chip-select to return high after the last byte
	loop {
		ensure!(wire.now < limit, "burst did not complete within {} ticks", limit);

		let out = wire.tick(true, false, 0);
		if out.rx_valid {
			info!("byte {}: 0x{:02x}", out.rx_count, out.rx_byte);
			received.push(out.rx_byte);
		}
		if out.ready {
			if let Some(&b) = next {
				// ready never coincides with rx_valid, the pulse is safe
				// to skip on the load tick
				wire.tick(true, true, b);
				next = pending.next();
			}
		}
		if next.is_none() && received.len() == bytes.len() && out.chip_select {
			break;
		}
	}

	ensure!(received == bytes,
		"loopback mismatch: sent {:02x?}, received {:02x?}", bytes, received);
	println!("loopback ok: {} bytes in {} reference ticks", bytes.len(), wire.now);

	Ok(())
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
