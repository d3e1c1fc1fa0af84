use std::collections::HashMap;
use std::env;
use std::fmt::Write;
use std::path::PathBuf;

fn main() {
    // (Variable, Type, Default value)
    let mut configs: HashMap<&str, (&str, &str)> = HashMap::from([
        ("MAC_MAX_FRAME_RETRIES", ("u8", "3")),
        ("MAC_MAX_DIRECT", ("usize", "4")),
        ("MAC_MAX_INDIRECT", ("usize", "8")),
        ("MAC_MAX_DATA", ("usize", "118")),
        ("MAC_TRANSACTION_PERSISTENCE_TIME", ("u16", "0x01f4")),
        ("MAC_RESPONSE_WAIT_TIME", ("u8", "32")),
        ("MAC_MAX_FRAME_TOTAL_WAIT_TIME", ("u32", "1220")),
        ("MAC_PAN_ID", ("u16", "0xffff")),
        ("MAC_MAX_LOST_BEACONS", ("u8", "4")),
        ("MAC_BEACON_PREPARE_LEAD", ("u32", "320")),
        ("MAC_BEACON_PROCESS_DELAY", ("u32", "64")),
    ]);

    // Make sure we get rerun if needed
    println!("cargo:rerun-if-changed=build.rs");
    for name in configs.keys() {
        println!("cargo:rerun-if-env-changed=BEACON154_{name}");
    }

    // Collect environment variables
    let mut data = String::new();

    for (var, value) in std::env::vars() {
        if let Some(name) = var.strip_prefix("BEACON154_") {
            // discard from hashmap as a way of consuming the setting
            let Some((_, (ty, _))) = configs.remove_entry(name) else {
                panic!("Wrong configuration name {name}");
            };

            // write to file
            writeln!(data, "pub const {name}: {ty} = {value};").unwrap();
        }
    }

    // Take the remaining configs and write the default value to the file
    for (name, (ty, value)) in configs.iter() {
        writeln!(data, "pub const {name}: {ty} = {value};").unwrap();
    }

    // Now that we have the code of the configuration, actually write it to a file
    let out_dir = PathBuf::from(env::var_os("OUT_DIR").unwrap());
    let out_file = out_dir.join("config.rs");
    std::fs::write(out_file, data).unwrap();
}
