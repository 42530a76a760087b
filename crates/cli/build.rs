use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("pluck")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Download the images of an article page as a zip archive")
        .arg(clap::arg!(<URL> "Article URL"))
        .arg(
            clap::arg!(-o --output <FILE> "Archive path (default: suggested name in the current directory)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(--html <FILE> "Read the article HTML from a file, or '-' for stdin")
                .value_name("FILE")
                .value_hint(clap::ValueHint::FilePath),
        )
        .arg(clap::arg!(-l --list "Only list the discovered image URLs"))
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format for --list")
                .value_name("FORMAT")
                .default_value("text")
                .value_parser(["text", "json"]),
        )
        .arg(clap::arg!(-i --interactive "Choose images page by page before packaging"))
        .arg(clap::arg!(--sequential "Fetch images one at a time"))
        .arg(clap::arg!(-j --jobs <NUM> "Parallel image downloads").default_value("8"))
        .arg(clap::arg!(--timeout <SECS> "Document request timeout in seconds").default_value("10"))
        .arg(clap::arg!(--image_timeout <SECS> "Per-image request timeout in seconds").default_value("5"))
        .arg(clap::arg!(--user_agent <UA> "Custom User-Agent for HTTP requests").value_name("UA"))
        .arg(clap::arg!(--content_id <ID> "id of the element holding the article body").default_value("js_content"))
        .arg(clap::arg!(--lazy_attr <ATTR> "Attribute holding the real image URL").default_value("data-src"))
        .arg(clap::arg!(--min_src_len <NUM> "Ignore image sources shorter than this").default_value("0"))
        .arg(clap::arg!(--page_size <NUM> "Images per page in interactive mode").default_value("12"))
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "pluck", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "pluck", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "pluck", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "pluck", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
