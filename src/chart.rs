use crate::formats::ScoreRatingPoint;
use crate::stats::{FrequencyTable, TrendPoint};

const PALETTE: [&str; 4] = ["#4c72b0", "#55a868", "#c44e52", "#8172b2"];
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 150.0;
const Y_TICKS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Area,
    Line,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedSeries {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Category labels on the x axis and one or more value series over them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub series: Vec<NamedSeries>,
}

impl ChartSeries {
    pub fn from_frequency(table: &FrequencyTable, name: &str) -> Self {
        let (labels, values) = table
            .iter()
            .map(|(label, count)| (label.to_owned(), Some(count as f64)))
            .unzip();
        Self {
            labels,
            series: vec![NamedSeries {
                name: name.to_owned(),
                values,
            }],
        }
    }

    pub fn from_score_rating(points: &[ScoreRatingPoint]) -> Self {
        Self {
            labels: points.iter().map(|p| short_label(&p.title)).collect(),
            series: vec![
                NamedSeries {
                    name: "My Scores".to_owned(),
                    values: points.iter().map(|p| Some(f64::from(p.my_score))).collect(),
                },
                NamedSeries {
                    name: "Overall Ratings".to_owned(),
                    values: points.iter().map(|p| Some(p.overall_rating)).collect(),
                },
            ],
        }
    }

    pub fn from_trend(points: &[TrendPoint], name: &str) -> Self {
        Self {
            labels: points.iter().map(|p| p.month.to_string()).collect(),
            series: vec![NamedSeries {
                name: name.to_owned(),
                values: points.iter().map(|p| p.value).collect(),
            }],
        }
    }

    fn max_value(&self) -> Option<f64> {
        self.series
            .iter()
            .flat_map(|s| s.values.iter().flatten().copied())
            .reduce(f64::max)
    }
}

#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub file_stem: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub width: u32,
    pub height: u32,
}

impl ChartOptions {
    pub fn new(file_stem: &str, title: &str, x_label: &str, y_label: &str) -> Self {
        Self {
            file_stem: file_stem.to_owned(),
            title: title.to_owned(),
            x_label: x_label.to_owned(),
            y_label: y_label.to_owned(),
            width: 1200,
            height: 480,
        }
    }
}

/// A rendered chart; the caller decides where `svg` is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartArtifact {
    pub file_name: String,
    pub svg: String,
}

/// First three words of a title, for crowded x axes.
pub fn short_label(title: &str) -> String {
    title.split_whitespace().take(3).collect::<Vec<_>>().join(" ")
}

pub fn render_series(series: &ChartSeries, kind: ChartKind, options: &ChartOptions) -> ChartArtifact {
    let plot = Plot::new(series, options);
    let mut svg = String::new();

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" font-family=\"sans-serif\">\n",
        w = options.width,
        h = options.height
    ));
    svg.push_str("  <rect width=\"100%\" height=\"100%\" fill=\"white\" />\n");
    svg.push_str(&format!(
        "  <text x=\"{x}\" y=\"28\" font-size=\"18\" text-anchor=\"middle\">{title}</text>\n",
        x = coord(f64::from(options.width) / 2.0),
        title = xml_escape(&options.title)
    ));

    plot.render_axes(&mut svg, options);
    match kind {
        ChartKind::Bar => plot.render_bars(&mut svg),
        ChartKind::Area => plot.render_areas(&mut svg),
        ChartKind::Line => plot.render_lines(&mut svg),
    }
    if kind != ChartKind::Bar || series.series.len() > 1 {
        plot.render_legend(&mut svg);
    }

    svg.push_str("</svg>\n");

    ChartArtifact {
        file_name: format!("{}.svg", options.file_stem),
        svg,
    }
}

struct Plot<'a> {
    series: &'a ChartSeries,
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    y_max: f64,
}

impl<'a> Plot<'a> {
    fn new(series: &'a ChartSeries, options: &ChartOptions) -> Self {
        let width = (f64::from(options.width) - MARGIN_LEFT - MARGIN_RIGHT).max(1.0);
        let height = (f64::from(options.height) - MARGIN_TOP - MARGIN_BOTTOM).max(1.0);
        let y_max = series.max_value().unwrap_or(0.0).max(1.0).ceil();
        Self {
            series,
            left: MARGIN_LEFT,
            top: MARGIN_TOP,
            width,
            height,
            y_max,
        }
    }

    fn band(&self) -> f64 {
        self.width / self.series.labels.len().max(1) as f64
    }

    fn x_center(&self, idx: usize) -> f64 {
        self.left + self.band() * (idx as f64 + 0.5)
    }

    fn y(&self, value: f64) -> f64 {
        self.top + self.height * (1.0 - value / self.y_max)
    }

    fn baseline(&self) -> f64 {
        self.top + self.height
    }

    fn render_axes(&self, svg: &mut String, options: &ChartOptions) {
        for tick in 0..=Y_TICKS {
            let value = self.y_max * f64::from(tick) / f64::from(Y_TICKS);
            let y = coord(self.y(value));
            svg.push_str(&format!(
                "  <line x1=\"{x1}\" y1=\"{y}\" x2=\"{x2}\" y2=\"{y}\" stroke=\"#dddddd\" />\n",
                x1 = coord(self.left),
                x2 = coord(self.left + self.width)
            ));
            svg.push_str(&format!(
                "  <text x=\"{x}\" y=\"{y}\" font-size=\"10\" text-anchor=\"end\" dominant-baseline=\"middle\">{label}</text>\n",
                x = coord(self.left - 6.0),
                label = tick_label(value)
            ));
        }

        svg.push_str(&format!(
            "  <line x1=\"{x}\" y1=\"{y1}\" x2=\"{x}\" y2=\"{y2}\" stroke=\"black\" />\n",
            x = coord(self.left),
            y1 = coord(self.top),
            y2 = coord(self.baseline())
        ));
        svg.push_str(&format!(
            "  <line x1=\"{x1}\" y1=\"{y}\" x2=\"{x2}\" y2=\"{y}\" stroke=\"black\" />\n",
            x1 = coord(self.left),
            x2 = coord(self.left + self.width),
            y = coord(self.baseline())
        ));

        for (idx, label) in self.series.labels.iter().enumerate() {
            let x = coord(self.x_center(idx));
            let y = coord(self.baseline() + 12.0);
            svg.push_str(&format!(
                "  <text x=\"{x}\" y=\"{y}\" font-size=\"10\" text-anchor=\"end\" transform=\"rotate(-45 {x} {y})\">{label}</text>\n",
                label = xml_escape(label)
            ));
        }

        svg.push_str(&format!(
            "  <text x=\"{x}\" y=\"{y}\" font-size=\"12\" text-anchor=\"middle\">{label}</text>\n",
            x = coord(self.left + self.width / 2.0),
            y = coord(self.baseline() + MARGIN_BOTTOM - 12.0),
            label = xml_escape(&options.x_label)
        ));
        let y_mid = coord(self.top + self.height / 2.0);
        svg.push_str(&format!(
            "  <text x=\"18\" y=\"{y_mid}\" font-size=\"12\" text-anchor=\"middle\" transform=\"rotate(-90 18 {y_mid})\">{label}</text>\n",
            label = xml_escape(&options.y_label)
        ));
    }

    fn render_bars(&self, svg: &mut String) {
        let group_width = self.band() * 0.8;
        let bar_width = group_width / self.series.series.len().max(1) as f64;
        for (si, named) in self.series.series.iter().enumerate() {
            let color = PALETTE[si % PALETTE.len()];
            for (idx, value) in named.values.iter().enumerate() {
                let Some(value) = value else {
                    continue;
                };
                let x = self.left + self.band() * idx as f64 + self.band() * 0.1 + bar_width * si as f64;
                let y = self.y(*value);
                svg.push_str(&format!(
                    "  <rect class=\"bar\" x=\"{x}\" y=\"{y}\" width=\"{w}\" height=\"{h}\" fill=\"{color}\"><title>{label}: {v}</title></rect>\n",
                    x = coord(x),
                    y = coord(y),
                    w = coord(bar_width),
                    h = coord(self.baseline() - y),
                    label = xml_escape(self.series.labels.get(idx).map_or("", String::as_str)),
                    v = tick_label(*value)
                ));
            }
        }
    }

    fn render_areas(&self, svg: &mut String) {
        for (si, named) in self.series.series.iter().enumerate() {
            let color = PALETTE[si % PALETTE.len()];
            let points = self.points(&named.values);
            let (Some(first), Some(last)) = (points.first(), points.last()) else {
                continue;
            };
            let mut path = format!("{},{}", coord(first.0), coord(self.baseline()));
            for (x, y) in &points {
                path.push_str(&format!(" {},{}", coord(*x), coord(*y)));
            }
            path.push_str(&format!(" {},{}", coord(last.0), coord(self.baseline())));
            svg.push_str(&format!(
                "  <polygon class=\"area\" points=\"{path}\" fill=\"{color}\" fill-opacity=\"0.5\" />\n"
            ));
        }
    }

    fn render_lines(&self, svg: &mut String) {
        for (si, named) in self.series.series.iter().enumerate() {
            let color = PALETTE[si % PALETTE.len()];
            let mut segment: Vec<(f64, f64)> = Vec::new();
            for (idx, value) in named.values.iter().enumerate() {
                match value {
                    Some(value) => segment.push((self.x_center(idx), self.y(*value))),
                    None => flush_segment(svg, &mut segment, color),
                }
            }
            flush_segment(svg, &mut segment, color);

            for (x, y) in self.points(&named.values) {
                svg.push_str(&format!(
                    "  <circle class=\"marker\" cx=\"{cx}\" cy=\"{cy}\" r=\"4\" fill=\"{color}\" />\n",
                    cx = coord(x),
                    cy = coord(y)
                ));
            }
        }
    }

    fn render_legend(&self, svg: &mut String) {
        let x = self.left + self.width - 140.0;
        for (si, named) in self.series.series.iter().enumerate() {
            let y = self.top + 8.0 + 18.0 * si as f64;
            svg.push_str(&format!(
                "  <rect x=\"{x}\" y=\"{y}\" width=\"12\" height=\"12\" fill=\"{color}\" />\n",
                x = coord(x),
                y = coord(y),
                color = PALETTE[si % PALETTE.len()]
            ));
            svg.push_str(&format!(
                "  <text x=\"{x}\" y=\"{y}\" font-size=\"11\">{name}</text>\n",
                x = coord(x + 18.0),
                y = coord(y + 10.0),
                name = xml_escape(&named.name)
            ));
        }
    }

    fn points(&self, values: &[Option<f64>]) -> Vec<(f64, f64)> {
        values
            .iter()
            .enumerate()
            .filter_map(|(idx, value)| value.map(|v| (self.x_center(idx), self.y(v))))
            .collect()
    }
}

fn flush_segment(svg: &mut String, segment: &mut Vec<(f64, f64)>, color: &str) {
    if segment.len() >= 2 {
        let points = segment
            .iter()
            .map(|(x, y)| format!("{},{}", coord(*x), coord(*y)))
            .collect::<Vec<_>>()
            .join(" ");
        svg.push_str(&format!(
            "  <polyline class=\"line\" points=\"{points}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"2\" />\n"
        ));
    }
    segment.clear();
}

fn coord(value: f64) -> String {
    format!("{value:.1}")
}

fn tick_label(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
