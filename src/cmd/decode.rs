use clap::Args;
use norn_resource::Resource;

/// Decodes a hex-encoded resource and prints its records
#[derive(Args, Debug)]
pub struct Command {
    /// The resource, hex encoded
    resource: String,
}

impl Command {
    pub fn run(&self) {
        let data = match base16ct::mixed::decode_vec(self.resource.trim()) {
            Ok(data) => data,
            Err(error) => {
                eprintln!("invalid hex input: {error}");
                std::process::exit(1);
            }
        };

        match Resource::decode(&data) {
            Ok(resource) => {
                println!("version: {}", resource.version);
                println!("ttl: {}", resource.ttl);
                for record in resource.records() {
                    println!("{record:?}");
                }
            }
            Err(error) => {
                eprintln!("invalid resource: {error}");
                std::process::exit(1);
            }
        }
    }
}
