//! Fixed text around the generated program: the `.caq` cassette header with
//! its BASIC `CALL` stub, and the trailer the loader expects.

use crate::rom::{FBUFFR, Routine};

/// Load address of the image.
pub const ORIGIN: u16 = 0x38E1;

const HEADER: &str = "
    ; Header and BASIC stub
    db $FF,$FF,$FF,$FF,$FF,$FF,$FF,$FF,$FF,$FF,$FF,$FF,$00
    db \"AQPLUS\"
    db $FF,$FF,$FF,$FF,$FF,$FF,$FF,$FF,$FF,$FF,$FF,$FF,$00
    db $0E,$39,$0A,$00,$DA,\"14608\",':',$80,$00,$00,$00
    jp main

main:
    push hl
";

const EXIT: &str = "
end:
    pop  hl
    ret
";

const TRAILER: &str = "
    ; A valid CAQ file needs 15 zeros at the end of the file
    db $00,$00,$00,$00,$00,$00,$00,$00,$00,$00,$00,$00,$00,$00,$00
";

/// Equates for every ROM routine followed by the container header.
pub fn header() -> String {
    let mut out = String::from("; ROM entry points\n");
    for routine in Routine::ALL {
        out.push_str(&format!(
            "{:<8} equ ${:04X}      ; {}\n",
            format!("{routine}:"),
            routine.address(),
            routine.contract()
        ));
    }
    let (name, address) = FBUFFR;
    out.push_str(&format!("{:<8} equ ${address:04X}\n", format!("{name}:")));
    out.push_str(&format!("\n    org ${ORIGIN:04X}\n"));
    out.push_str(HEADER);
    out
}

/// The shared exit every `END` jumps to.
pub fn exit() -> &'static str {
    EXIT
}

pub fn trailer() -> &'static str {
    TRAILER
}
