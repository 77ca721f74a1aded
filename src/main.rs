use clap::{arg,crate_version,Command};
use squeeze::{container,Backend,Options,STD_OPTIONS};

const RCH: &str = "unreachable was reached";

fn main() -> Result<(),Box<dyn std::error::Error>>
{
    env_logger::init();

    let long_help =
"Examples:
---------
Compress:      `squeeze compress -m rc -i my_expanded -o my_compressed`
Expand:        `squeeze expand -i my_compressed -o my_expanded`";

    let methods = ["rc","huff"];

    let mut main_cmd = Command::new("squeeze")
        .about("Compress and expand byte streams with adaptive entropy coding")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(Command::new("compress")
        .arg(arg!(-m --method <METHOD> "entropy coding back end").value_parser(methods)
            .default_value("rc"))
        .arg(arg!(-w --window <SIZE> "window size, power of two").value_parser(clap::value_parser!(u32))
            .default_value("32768"))
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .about("compress a file"));

    main_cmd = main_cmd.subcommand(Command::new("expand")
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .about("expand a file"));

    let matches = main_cmd.get_matches();

    if let Some(cmd) = matches.subcommand_matches("compress") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let method = cmd.get_one::<String>("method").expect(RCH);
        let window = *cmd.get_one::<u32>("window").expect(RCH) as usize;
        let opt = Options {
            window,
            backend: match method.as_str() {
                "huff" => Backend::AdaptiveHuffman,
                _ => Backend::RangeCoder
            },
            accel: STD_OPTIONS.accel
        };
        let dat = std::fs::read(path_in)?;
        let compressed = container::compress_slice(&dat,&opt)?;
        eprintln!("{} -> {} ({:.1}%)",dat.len(),compressed.len(),
            100.0 * compressed.len() as f64 / dat.len().max(1) as f64);
        std::fs::write(path_out,compressed)?;
    }

    if let Some(cmd) = matches.subcommand_matches("expand") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let dat = std::fs::read(path_in)?;
        let expanded = container::expand_slice(&dat)?;
        std::fs::write(path_out,expanded)?;
    }

    Ok(())
}
