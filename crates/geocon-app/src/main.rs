//! GeoCon 命令行入口
//!
//! 无界面的作图工具：生成示例作图、检查文档、在命令行上模拟拖动。

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use geocon_core::prelude::*;
use geocon_file::Document;

#[derive(Parser, Debug)]
#[command(name = "geocon", about = "Geometric construction engine command line")]
struct Cli {
    /// 引擎配置（JSON）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 日志级别：error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 生成示例作图并保存
    Demo(DemoArgs),
    /// 打印文档内容与度量
    Inspect(InspectArgs),
    /// 拖动一个点并传播
    Drag(DragArgs),
}

#[derive(Args, Debug)]
struct DemoArgs {
    /// 输出文件（.json 或 .geocon）
    #[arg(short, long, default_value = "demo.json")]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct InspectArgs {
    path: PathBuf,
}

#[derive(Args, Debug)]
struct DragArgs {
    path: PathBuf,

    /// 被拖动的点，例如 pt3
    #[arg(long)]
    point: String,

    /// 目标 x 坐标
    #[arg(long, allow_negative_numbers = true)]
    x: f64,

    /// 目标 y 坐标
    #[arg(long, allow_negative_numbers = true)]
    y: f64,

    /// 分几帧移动到目标
    #[arg(long, default_value_t = 1)]
    steps: u32,

    /// 输出文件，缺省时覆盖原文件
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    let config = serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

/// 示例：三角形、边中点、外接圆、高、两条中线的交点
fn build_demo(config: EngineConfig) -> Result<Document> {
    let mut model = Model::new();
    model.set_config(config);
    let mut labels = LabelState::new();

    let a = model.add_point(Point2::new(0.0, 0.0));
    let b = model.add_point(Point2::new(240.0, 0.0));
    let c = model.add_point(Point2::new(80.0, 180.0));
    let ab = model.add_line(a, b)?;
    let bc = model.add_line(b, c)?;
    let ca = model.add_line(c, a)?;
    model.add_polygon(&[ab, bc, ca])?;

    let mid_ab = model.add_segment_midpoint(ab, 0)?;
    let mid_bc = model.add_segment_midpoint(bc, 0)?;
    let median_c = model.add_line(c, mid_ab)?;
    let median_a = model.add_line(a, mid_bc)?;
    let centroid = model.add_intersection_point(
        ParentRef::Line(median_c),
        ParentRef::Line(median_a),
        Point2::new(100.0, 60.0),
    )?;

    model.add_circle_three_points(a, b, c)?;
    let altitude = model.add_perpendicular_line(c, ab)?;
    model.add_angle(a, [AngleLeg { line: ab, seg: 0 }, AngleLeg { line: ca, seg: 0 }])?;

    for point in [a, b, c, mid_ab, mid_bc, centroid] {
        model.set_label(EntityRef::Point(point), Some(Label::new(labels.next_point_label())))?;
    }
    for line in [ab, bc, ca, altitude] {
        model.set_label(EntityRef::Line(line), Some(Label::new(labels.next_line_label())))?;
    }
    if let Some(angle) = model.angles().first().map(|angle| angle.id) {
        model.set_label(EntityRef::Angle(angle), Some(Label::new(labels.next_angle_label())))?;
    }

    let mut document = Document::with_model(model);
    document.label_state = labels;
    info!("Created {} demo entities", document.model.entity_count());
    Ok(document)
}

fn label_of(model: &Model, point: PointId) -> String {
    model
        .point(point)
        .and_then(|p| p.label.as_ref())
        .map_or_else(|| point.to_string(), |label| format!("{} ({point})", label.text))
}

fn inspect(document: &Document) {
    let model = &document.model;
    println!(
        "{} points, {} lines, {} circles, {} angles, {} polygons",
        model.points().len(),
        model.lines().len(),
        model.circles().len(),
        model.angles().len(),
        model.polygons().len()
    );

    for point in model.points() {
        let hidden = if point.is_hidden() { " [hidden]" } else { "" };
        println!(
            "  {:<16} {:<12} ({:.3}, {:.3}){hidden}",
            label_of(model, point.id),
            point.construction.name(),
            point.position.x,
            point.position.y
        );
    }
    for line in model.lines() {
        let segments: Vec<String> = (0..line.segment_count())
            .filter_map(|seg| document.measured_length(line.id, seg))
            .map(|length| format!("{length:.3}"))
            .collect();
        println!(
            "  {:<16} {:<12} segments [{}]",
            line.id.to_string(),
            line.construction.name(),
            segments.join(", ")
        );
    }
    for circle in model.circles() {
        if let Some(radius) = model.radius(circle.id) {
            println!("  {:<16} radius {radius:.3}", circle.id.to_string());
        }
    }
    for angle in model.angles() {
        if let Some(degrees) = model.angle_degrees(angle.id) {
            println!("  {:<16} {degrees:.2}°", angle.id.to_string());
        }
    }

    let issues = model.check_consistency();
    if issues.is_empty() {
        println!("consistent");
    } else {
        for issue in issues {
            println!("  ! {issue}");
        }
    }
}

fn drag(document: &mut Document, args: &DragArgs) -> Result<()> {
    let point: PointId = args.point.parse()?;
    let model = &mut document.model;
    let Some(start) = model.position(point) else {
        bail!("point {point} does not exist");
    };
    let Some(mut session) = DragSession::begin(model, DragTarget::Point(point), start) else {
        bail!("point {point} cannot be dragged");
    };

    let target = Point2::new(args.x, args.y);
    let steps = args.steps.max(1);
    for step in 1..=steps {
        let t = f64::from(step) / f64::from(steps);
        let frame = session.update(model, start + (target - start) * t);
        if frame.snap_indicator() {
            info!("frame {step}: snapped");
        }
    }
    let outcome = session.end(model);

    let position = model.position(point).unwrap_or(start);
    println!(
        "{point} -> ({:.3}, {:.3}){}",
        position.x,
        position.y,
        outcome.snapped.map_or(String::new(), |axis| format!(" snapped {}", axis.name()))
    );
    if !outcome.moved {
        println!("nothing moved");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    tracing::subscriber::set_global_default(FmtSubscriber::builder().with_max_level(cli.log_level).finish())?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Demo(args) => {
            let document = build_demo(config)?;
            geocon_file::save(&document, &args.output)?;
            inspect(&document);
        }
        Command::Inspect(args) => {
            let document = geocon_file::load(&args.path)?;
            inspect(&document);
        }
        Command::Drag(args) => {
            let mut document = geocon_file::load(&args.path)?;
            document.model.set_config(config);
            drag(&mut document, &args)?;
            let output = args.output.as_deref().unwrap_or(&args.path);
            geocon_file::save(&document, output)?;
            info!("Wrote {}", output.display());
        }
    }

    Ok(())
}
