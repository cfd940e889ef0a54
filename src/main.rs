use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{anyhow, Context, Result};
use clap;
use serde::Serialize;
use structopt::StructOpt;

use mp4cenc::cenc;
use mp4cenc::debug;
use mp4cenc::fragment::Sample;
use mp4cenc::io::Mp4File;
use mp4cenc::mp4box::MP4;
use mp4cenc::subtitle;

#[derive(StructOpt, Debug)]
#[structopt(setting = clap::AppSettings::VersionlessSubcommands)]
pub struct MainOpts {
    #[structopt(long)]
    /// Log options (like RUSTLOG; trace, debug, info etc)
    pub log: Option<String>,
    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(StructOpt, Debug)]
#[structopt(rename_all = "kebab-case")]
pub enum Command {
    #[structopt(display_order = 1)]
    /// Show the boxes.
    Boxes(BoxesOpts),

    #[structopt(display_order = 2)]
    /// List the samples of all fragments.
    Samples(SamplesOpts),

    #[structopt(display_order = 3)]
    /// extract WebVTT subtitles.
    Subtitles(SubtitlesOpts),

    #[structopt(display_order = 4)]
    /// Decrypt a CENC protected fragmented file.
    Decrypt(DecryptOpts),
}

#[derive(StructOpt, Debug)]
pub struct BoxesOpts {
    /// Input filename.
    pub input: String,
}

#[derive(StructOpt, Debug)]
pub struct SamplesOpts {
    #[structopt(short, long)]
    /// Select a track.
    pub track: Option<u32>,

    #[structopt(long)]
    /// Output JSON.
    pub json: bool,

    /// Input filename.
    pub input: String,
}

#[derive(StructOpt, Debug)]
pub struct SubtitlesOpts {
    #[structopt(short, long)]
    /// Select the wvtt track.
    pub track: u32,

    /// Input filename.
    pub input: String,
}

#[derive(StructOpt, Debug)]
pub struct DecryptOpts {
    #[structopt(short, long)]
    /// Content key, 32 hex digits.
    pub key: String,

    /// Input filename.
    pub input:  String,
    /// Output filename.
    pub output: String,
}

fn main() -> Result<()> {
    let opts = MainOpts::from_args();

    let mut builder = env_logger::Builder::new();
    if let Some(ref log_opts) = opts.log {
        builder.parse_filters(log_opts);
    } else if let Ok(ref log_opts) = std::env::var("RUST_LOG") {
        builder.parse_filters(log_opts);
    } else {
        builder.parse_filters("info");
    }
    builder.init();

    match opts.cmd {
        Command::Boxes(opts) => return boxes(opts),
        Command::Samples(opts) => return samples(opts),
        Command::Subtitles(opts) => return subtitles(opts),
        Command::Decrypt(opts) => return decrypt(opts),
    }
}

fn open(input: &str) -> Result<MP4> {
    let reader = Mp4File::open(input).with_context(|| format!("{}", input))?;
    let mp4 = reader.read_mp4().with_context(|| format!("{}", input))?;
    Ok(mp4)
}

fn boxes(opts: BoxesOpts) -> Result<()> {
    let mp4 = open(&opts.input)?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    debug::dump_box_tree(&mp4, &mut handle)?;
    Ok(())
}

#[derive(Serialize)]
struct FragmentSamples {
    sequence_number: u32,
    track_id:        u32,
    samples:         Vec<Sample>,
}

fn samples(opts: SamplesOpts) -> Result<()> {
    let mp4 = open(&opts.input)?;
    if !mp4.is_fragmented() {
        log::warn!("{}: not a fragmented file", opts.input);
    }
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    if !opts.json {
        debug::dump_fragment_samples(&mp4, opts.track, &mut handle)?;
        return Ok(());
    }

    let mut res = Vec::new();
    for frag in mp4.fragments() {
        for tfs in frag.track_fragments()? {
            if opts.track.map(|id| id != tfs.track_id).unwrap_or(false) {
                continue;
            }
            res.push(FragmentSamples {
                sequence_number: frag.sequence_number(),
                track_id:        tfs.track_id,
                samples:         tfs.samples,
            });
        }
    }
    serde_json::to_writer_pretty(&mut handle, &res)?;
    writeln!(handle)?;
    Ok(())
}

fn subtitles(opts: SubtitlesOpts) -> Result<()> {
    let mp4 = open(&opts.input)?;
    let stdout = io::stdout();
    let handle = BufWriter::new(stdout.lock());
    subtitle::subtitle_extract(&mp4, opts.track, handle)?;
    Ok(())
}

fn content_key(key: &str) -> Result<Vec<u8>> {
    let key = hex::decode(key.trim()).context("Invalid content key hex")?;
    if key.len() != 16 {
        return Err(anyhow!("content key must be 16 bytes, not {}", key.len()));
    }
    Ok(key)
}

fn decrypt(opts: DecryptOpts) -> Result<()> {
    let key = content_key(&opts.key)?;
    let mp4 = open(&opts.input)?;
    if !mp4.is_fragmented() {
        return Err(anyhow!("{}: not a fragmented file", opts.input));
    }

    let clear = cenc::decrypt_file(&mp4, &key, &cenc::cenc_scheme)?;

    let data = clear.to_bytes()?;
    let mut file = File::create(&opts.output).with_context(|| format!("{}", opts.output))?;
    file.write_all(&data).with_context(|| format!("{}", opts.output))?;
    log::info!("{}: wrote {} bytes", opts.output, data.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_from_hex() {
        let key = content_key(" 2b7e151628aed2a6abf7158809cf4f3c\n").unwrap();
        assert_eq!(key[..4], [0x2b, 0x7e, 0x15, 0x16]);
        assert_eq!(key.len(), 16);
        assert!(content_key("2b7e15").is_err());
        assert!(content_key("zz7e151628aed2a6abf7158809cf4f3c").is_err());
    }
}
