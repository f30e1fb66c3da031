use std::env;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader};

use ls8::{Cpu, TerminalInput, WallClock};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let path = env::args()
        .nth(1)
        .ok_or("usage: ls8 <program.ls8>")?;
    if !path.ends_with(".ls8") {
        return Err("program listing must end with .ls8".into());
    }

    let mut clock = WallClock::new();
    let mut input = TerminalInput::new()?;
    let mut output = io::stdout();
    let mut cpu = Cpu::new(&mut clock, &mut input, &mut output);

    let file = File::open(&path)?;
    cpu.load_program(&mut BufReader::new(file))?;
    cpu.run()?;

    Ok(())
}
