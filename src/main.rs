use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use vt_imagemap::cli::{CheckArgs, Cli, Command, RenderArgs, ReportFormat};
use vt_imagemap::filter::Filter;
use vt_imagemap::mapper::{CoordinateMapper, scale_denominator};
use vt_imagemap::query::style_filter;
use vt_imagemap::render::LayerRenderer;
use vt_imagemap::{ImageMapEncoder, read_request};

#[derive(Debug, Serialize)]
struct LayerCheck {
    name: String,
    feature_count: usize,
    rule_count: usize,
    style_pushdown: bool,
    query: String,
}

#[derive(Debug, Serialize)]
struct RequestCheck {
    width: u32,
    height: u32,
    crs: String,
    scale_denominator: f64,
    layers: Vec<LayerCheck>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    match cli.command {
        Command::Render(args) => render(&args),
        Command::Check(args) => check(&args),
    }
}

fn render(args: &RenderArgs) -> Result<()> {
    let request = read_request(&args.request)?;
    let encoder = ImageMapEncoder::new(&request);
    match args.output.as_deref() {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            encoder.encode(&mut writer)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            encoder.encode(stdout.lock())?;
        }
    }
    Ok(())
}

fn check(args: &CheckArgs) -> Result<()> {
    let request = read_request(&args.request)?;
    let mapper = CoordinateMapper::new(request.bbox, request.width, request.height);
    let mut layers = Vec::new();
    for layer in &request.layers {
        let renderer = LayerRenderer::new(&request, layer, &mapper);
        let groups = renderer.groups();
        let feature_count = layer
            .source
            .features(&Filter::Include)
            .with_context(|| format!("open layer {}", layer.name))?
            .count();
        let query = renderer
            .query()
            .with_context(|| format!("build query for layer {}", layer.name))?;
        layers.push(LayerCheck {
            name: layer.name.clone(),
            feature_count,
            rule_count: groups.iter().map(|group| group.rules.len()).sum(),
            style_pushdown: style_filter(groups).is_some(),
            query: query.to_string(),
        });
    }
    let report = RequestCheck {
        width: request.width,
        height: request.height,
        crs: request.crs.code.clone(),
        scale_denominator: scale_denominator(&request.bbox, &request.crs, request.width),
        layers,
    };

    match args.output {
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&report)?;
            println!("{}", json);
        }
        ReportFormat::Text => {
            println!(
                "size: {}x{} crs: {} scale: 1:{:.0}",
                report.width, report.height, report.crs, report.scale_denominator
            );
            for layer in report.layers.iter() {
                println!(
                    "layer: {} features={} rules={} style_pushdown={}",
                    layer.name, layer.feature_count, layer.rule_count, layer.style_pushdown
                );
                println!("  query: {}", layer.query);
            }
        }
    }
    Ok(())
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
