//! Legacy numeric `aid` to public `BV` identifier conversion.

const TABLE: &[u8; 58] = b"fZodR9XQDSUm21yCkr6zBqiveYah8bt4xsWpHnJE7jL5VG3guMTKNPAwcF";
const XOR: u64 = 177451812;
const ADD: u64 = 8728348608;
const POSITIONS: [usize; 6] = [11, 10, 3, 8, 4, 6];
const TEMPLATE: &[u8; 12] = b"BV1  4 1 7  ";

/// Convert an `av` number into its `BV` identifier.
pub fn aid_to_bvid(aid: u64) -> String {
    let z = (aid ^ XOR) + ADD;
    let mut out = *TEMPLATE;
    let mut power = 1u64;
    for pos in POSITIONS {
        out[pos] = TABLE[((z / power) % 58) as usize];
        power *= 58;
    }
    out.iter().map(|&b| b as char).collect()
}
