//! Polled mode: one timed read, one send, repeat.

use crate::app::ports::AnalogPort;
use crate::error::Result;
use crate::protocol::Datagram;
use crate::protocol::codec::{GROUP_BYTES, SampleGroup, encode_samples};

/// Take `repeats` timed 4-sample reads, sending each group as soon as it
/// is read.  The next read starts only after the send returns.
pub fn run<A, D>(adc: &mut A, link: &mut D, repeats: u32) -> Result<()>
where
    A: AnalogPort + ?Sized,
    D: Datagram + ?Sized,
{
    let mut group: SampleGroup = [0; 4];
    let mut wire = [0u8; GROUP_BYTES];
    for _ in 0..repeats {
        adc.read_timed(&mut group);
        encode_samples(&group, &mut wire);
        link.send(&wire)?;
    }
    log::debug!("polled: {repeats} groups sent");
    Ok(())
}
