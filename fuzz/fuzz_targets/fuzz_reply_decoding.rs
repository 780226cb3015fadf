//! Fuzz target: host-side reply decoding
//!
//! Treats arbitrary bytes as whatever the device might have sent: an
//! opcode, a count payload, a burst block or a stream chunk.  None of the
//! decoders may panic and the reconstructed records must respect the
//! requested row count.
//!
//! cargo fuzz run fuzz_reply_decoding

#![no_main]

use apic::app::Command;
use apic::host::{CalibrationCurve, SampleTable, StreamRecord};
use apic::protocol::Opcode;
use apic::protocol::codec::{decode_samples, decode_u32, decode_u64, decode_words};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Some(op) = Opcode::from_bytes(data) {
        if let Some(cmd) = Command::from_opcode(op) {
            assert_eq!(cmd.opcode(), op);
        }
    }

    let count = decode_u32(data).map_or(0, |c| c as usize % 1024);
    let _ = decode_u64(data);

    let mut samples = Vec::new();
    decode_samples(data, &mut samples);
    assert_eq!(samples.len(), data.len() / 2);
    let table = SampleTable::from_raw(&samples, count, &CalibrationCurve::IDENTITY);
    assert!(table.len() <= count);

    let mut words = Vec::new();
    decode_words(data, &mut words);
    assert_eq!(words.len(), data.len() / 4);
    let record = StreamRecord::from_words(&words, count);
    assert!(record.len() <= count);
    assert!(record.adc().iter().all(|v| *v <= 4095.0));
});
