#![no_main]

use norn_resource::Resource;

libfuzzer_sys::fuzz_target!(|data: &[u8]| {
    let _ = Resource::decode(data);
});
