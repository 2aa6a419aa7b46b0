//! Console rendering of the bring-up diagnostics

use spiram_core::bus::{opcodes, LineWidth};
use spiram_core::{Diagnostics, DiagnosticsReporter, Failure, Mismatch, Outcome};

fn mode(lines: LineWidth) -> &'static str {
    match lines {
        LineWidth::Single => "spi",
        LineWidth::Quad => "qspi",
    }
}

/// Operator wording for a self-test mismatch
pub fn describe_mismatch(mismatch: &Mismatch) -> String {
    match *mismatch {
        Mismatch::Byte {
            address,
            expected,
            observed,
        } => format!(
            "memtest8 fail, address {:#010x} written {:#04x} read {:#04x}",
            address, expected, observed
        ),
        Mismatch::Half {
            address,
            expected,
            observed,
        } => format!(
            "memtest16 fail, address {:#010x} written {:#06x} read {:#06x}",
            address, expected, observed
        ),
        Mismatch::Word {
            address,
            expected,
            observed,
        } => format!(
            "memtest32 fail, address {:#010x} written {:#010x} read {:#010x}",
            address, expected, observed
        ),
    }
}

/// Operator wording for a failed step
pub fn describe_failure(failure: &Failure) -> String {
    match failure {
        Failure::ControllerInit => "ospi init fail".to_string(),
        Failure::ResetEnable { lines } => format!("{} rst_en fail", mode(*lines)),
        Failure::Reset { lines } => format!("{} rst fail", mode(*lines)),
        Failure::ReadIdCommand => "readid cmd fail".to_string(),
        Failure::ReadIdData => "readid dta fail".to_string(),
        Failure::QuadEnable => "spi quad on fail".to_string(),
        Failure::Clear => "clear fail".to_string(),
        Failure::Protection => "mpu config fail".to_string(),
        Failure::WritePathConfig => "mmap write config fail".to_string(),
        Failure::ReadPathConfig => "mmap read config fail".to_string(),
        Failure::MappingActivation => "mmap fail".to_string(),
        Failure::SelfTest(mismatch) => describe_mismatch(mismatch),
    }
}

/// Operator wording for a recorded outcome
pub fn describe_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::SelfTestPass => "memtest pass".to_string(),
        Outcome::Failed(failure) => describe_failure(failure),
    }
}

/// Render the report lines for one run
///
/// The identifier line is always present, zeroed when it was not read.
pub fn render(diagnostics: &Diagnostics) -> Vec<String> {
    let id = diagnostics
        .identifier()
        .copied()
        .unwrap_or([0; opcodes::IDENTIFIER_LEN]);
    let mut eid = String::from("spiram eid");
    for byte in id {
        eid.push_str(&format!(" {:02x}", byte));
    }

    let status = match diagnostics.outcome() {
        Some(outcome) => format!("spiram {}", describe_outcome(&outcome)),
        None => "spiram ok".to_string(),
    };

    vec![eid, status]
}

/// Prints the report to stdout
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl DiagnosticsReporter for ConsoleReporter {
    fn report(&mut self, diagnostics: &Diagnostics) {
        for line in render(diagnostics) {
            println!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passing_run() {
        let mut diag = Diagnostics::new();
        diag.set_identifier([0x0D, 0x5D, 0x52, 0xA2, 0x64, 0x31, 0x91, 0x31]);
        diag.record_if_absent(Outcome::SelfTestPass);
        assert_eq!(
            render(&diag),
            ["spiram eid 0d 5d 52 a2 64 31 91 31", "spiram memtest pass"]
        );
    }

    #[test]
    fn test_half_word_failure_wording() {
        let mut diag = Diagnostics::new();
        diag.record_if_absent(Failure::SelfTest(Mismatch::Half {
            address: 0x903E_2070,
            expected: 0x5A5A,
            observed: 0x0000,
        }));
        assert_eq!(
            render(&diag),
            [
                "spiram eid 00 00 00 00 00 00 00 00",
                "spiram memtest16 fail, address 0x903e2070 written 0x5a5a read 0x0000",
            ]
        );
    }

    #[test]
    fn test_step_failure_wording() {
        let cases = [
            (Failure::ControllerInit, "ospi init fail"),
            (Failure::ResetEnable { lines: LineWidth::Quad }, "qspi rst_en fail"),
            (Failure::Reset { lines: LineWidth::Single }, "spi rst fail"),
            (Failure::ReadIdCommand, "readid cmd fail"),
            (Failure::ReadIdData, "readid dta fail"),
            (Failure::QuadEnable, "spi quad on fail"),
            (Failure::WritePathConfig, "mmap write config fail"),
            (Failure::MappingActivation, "mmap fail"),
        ];
        for (failure, wording) in cases {
            let mut diag = Diagnostics::new();
            diag.record_if_absent(failure);
            assert_eq!(render(&diag)[1], format!("spiram {}", wording));
        }
    }

    #[test]
    fn test_byte_and_word_wording() {
        let byte = Mismatch::Byte {
            address: 0x9000_0001,
            expected: 0xA5,
            observed: 0x00,
        };
        assert_eq!(
            describe_mismatch(&byte),
            "memtest8 fail, address 0x90000001 written 0xa5 read 0x00"
        );
        let word = Mismatch::Word {
            address: 0x9000_0010,
            expected: 0xA5A5_A5A5,
            observed: 0,
        };
        assert_eq!(
            describe_mismatch(&word),
            "memtest32 fail, address 0x90000010 written 0xa5a5a5a5 read 0x00000000"
        );
    }

    #[test]
    fn test_nothing_recorded() {
        let diag = Diagnostics::new();
        assert_eq!(render(&diag)[1], "spiram ok");
    }
}
