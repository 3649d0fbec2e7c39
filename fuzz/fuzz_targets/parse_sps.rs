#![no_main]

use hevc_sps::Parser;
use hevc_sps::ParserConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for needs_epb in [false, true] {
        let parser = Parser::new(ParserConfig { needs_epb });
        if let Ok(decoded) = parser.parse_sps(data) {
            let _ = decoded.value.display_resolution();
        }
    }
});
