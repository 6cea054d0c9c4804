use anyhow::Result;
use carbon_anomaly::{report, AnomalyRecord, CarbonReportRow, MergedRecord, PipelineConfig};
use chrono::{Duration, NaiveDate};
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

const ORANGE: RGBColor = RGBColor(255, 127, 14);

type MonthlySeries = Vec<(NaiveDate, f64)>;

const WEATHER_METRICS: [(&str, fn(&MergedRecord) -> Option<f64>); 3] = [
    ("avg_temp_c", |r| r.avg_temp_c),
    ("precip_mm", |r| r.precip_mm),
    ("wind_kmh", |r| r.wind_kmh),
];

pub fn run(config: &PipelineConfig) -> Result<()> {
    println!("📊 Generating report charts");
    std::fs::create_dir_all(&config.plots_dir)?;

    if config.merged_csv.exists() {
        let merged = report::read_merged_csv(&config.merged_csv)?;
        plot_weather_vs_consumption(
            &merged,
            &config.plots_dir.join("weather_vs_consumption.png"),
        )?;
    } else {
        println!(
            "  {} not found. Skipping weather vs consumption plot.",
            config.merged_csv.display()
        );
    }

    if config.anomalies_csv.exists() {
        let anomalies = report::read_anomalies_csv(&config.anomalies_csv)?;
        plot_anomalies(&anomalies, &config.plots_dir.join("anomalies_plot.png"))?;
    } else {
        println!(
            "  {} not found. Skipping anomalies plot.",
            config.anomalies_csv.display()
        );
    }

    if config.carbon_report_csv.exists() {
        let carbon_report = report::read_carbon_report_csv(&config.carbon_report_csv)?;
        plot_carbon(&carbon_report, &config.plots_dir.join("carbon_emissions_plot.png"))?;
    } else {
        println!(
            "  {} not found. Skipping carbon emissions plot.",
            config.carbon_report_csv.display()
        );
    }

    Ok(())
}

fn month_start(month: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d").ok()
}

fn date_bounds(dates: impl Iterator<Item = NaiveDate>) -> Option<(NaiveDate, NaiveDate)> {
    let (min, max) = dates.fold(None, |acc: Option<(NaiveDate, NaiveDate)>, d| match acc {
        None => Some((d, d)),
        Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
    })?;
    Some((min - Duration::days(15), max + Duration::days(15)))
}

fn value_bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (min, max) = values.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })?;
    let pad = if max > min { (max - min) * 0.1 } else { max.abs().max(1.0) * 0.1 };
    Some((min - pad, max + pad))
}

/// Monthly mean of `value` over the rows that have both a month and a value.
fn monthly_mean(
    records: &[MergedRecord],
    value: impl Fn(&MergedRecord) -> Option<f64>,
) -> MonthlySeries {
    let mut months: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for record in records {
        let (Some(month), Some(v)) = (month_start(&record.month), value(record)) else {
            continue;
        };
        let entry = months.entry(month).or_insert((0.0, 0));
        entry.0 += v;
        entry.1 += 1;
    }
    months
        .into_iter()
        .map(|(month, (sum, count))| (month, sum / count as f64))
        .collect()
}

/// Monthly consumption total, summed over production types.
fn monthly_consumption(records: &[MergedRecord]) -> MonthlySeries {
    let mut months: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in records {
        if let (Some(month), Some(v)) = (month_start(&record.month), record.value_gwh) {
            *months.entry(month).or_insert(0.0) += v;
        }
    }
    months.into_iter().collect()
}

/// One panel per weather metric, consumption on the left axis and the
/// metric on the right.
pub fn plot_weather_vs_consumption(records: &[MergedRecord], output_path: &Path) -> Result<bool> {
    let consumption = monthly_consumption(records);
    let (Some((min_date, max_date)), Some((min_gwh, max_gwh))) = (
        date_bounds(consumption.iter().map(|c| c.0)),
        value_bounds(consumption.iter().map(|c| c.1)),
    ) else {
        println!("  No consumption data to plot against weather.");
        return Ok(false);
    };

    let root = BitMapBackend::new(output_path, (1200, 500 * WEATHER_METRICS.len() as u32))
        .into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((WEATHER_METRICS.len(), 1));

    for (panel, (metric, value)) in panels.iter().zip(WEATHER_METRICS) {
        let weather = monthly_mean(records, value);
        let (weather_lo, weather_hi) =
            value_bounds(weather.iter().map(|w| w.1)).unwrap_or((0.0, 1.0));

        let mut chart = ChartBuilder::on(panel)
            .caption(format!("Consumption vs {}", metric), ("sans-serif", 24).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(80)
            .right_y_label_area_size(80)
            .build_cartesian_2d(min_date..max_date, min_gwh..max_gwh)?
            .set_secondary_coord(min_date..max_date, weather_lo..weather_hi);

        chart
            .configure_mesh()
            .x_desc("Month")
            .y_desc("Consumption (GWh)")
            .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m").to_string())
            .draw()?;
        chart.configure_secondary_axes().y_desc(metric).draw()?;

        chart
            .draw_series(LineSeries::new(consumption.iter().copied(), &BLUE))?
            .label("Consumption (GWh)")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
        chart
            .draw_secondary_series(LineSeries::new(weather.iter().copied(), &ORANGE))?
            .label(metric)
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &ORANGE));

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()?;
    println!("  ✅ Saved {}", output_path.display());
    Ok(true)
}

/// Scatter of anomalous values, one colour per production type. Returns
/// false when there is nothing to draw.
pub fn plot_anomalies(anomalies: &[AnomalyRecord], output_path: &Path) -> Result<bool> {
    let points: Vec<(&str, NaiveDate, f64)> = anomalies
        .iter()
        .filter_map(|a| {
            Some((
                a.record.production_type.as_str(),
                month_start(&a.record.month)?,
                a.record.value_gwh?,
            ))
        })
        .collect();

    let (Some((min_date, max_date)), Some((min_value, max_value))) = (
        date_bounds(points.iter().map(|p| p.1)),
        value_bounds(points.iter().map(|p| p.2)),
    ) else {
        println!("  No anomalies to plot.");
        return Ok(false);
    };

    let mut production_types: Vec<&str> = Vec::new();
    for (production_type, _, _) in &points {
        if !production_types.contains(production_type) {
            production_types.push(*production_type);
        }
    }

    let root = BitMapBackend::new(output_path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Detected Consumption Anomalies by Energy Type",
            ("sans-serif", 30).into_font(),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(min_date..max_date, min_value..max_value)?;

    chart
        .configure_mesh()
        .x_desc("Month")
        .y_desc("Anomalous Consumption (GWh)")
        .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m").to_string())
        .draw()?;

    for (idx, production_type) in production_types.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart
            .draw_series(
                points
                    .iter()
                    .filter(|p| p.0 == *production_type)
                    .map(|p| Circle::new((p.1, p.2), 5, color.filled())),
            )?
            .label(*production_type)
            .legend(move |(x, y)| Circle::new((x, y), 5, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    println!("  ✅ Saved {}", output_path.display());
    Ok(true)
}

/// Monthly emissions in tonnes CO2e.
pub fn plot_carbon(carbon_report: &[CarbonReportRow], output_path: &Path) -> Result<bool> {
    let mut series: Vec<(NaiveDate, f64)> = carbon_report
        .iter()
        .filter_map(|r| Some((month_start(&r.month)?, r.carbon_kg / 1000.0)))
        .collect();
    series.sort_by_key(|(d, _)| *d);

    let (Some((min_date, max_date)), Some((min_value, max_value))) = (
        date_bounds(series.iter().map(|s| s.0)),
        value_bounds(series.iter().map(|s| s.1)),
    ) else {
        println!("  No carbon data to plot.");
        return Ok(false);
    };

    let root = BitMapBackend::new(output_path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Monthly Carbon Emissions from Electricity Consumption",
            ("sans-serif", 30).into_font(),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(90)
        .build_cartesian_2d(min_date..max_date, min_value.min(0.0)..max_value)?;

    chart
        .configure_mesh()
        .x_desc("Month")
        .y_desc("Total Carbon Emissions (tonnes)")
        .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m").to_string())
        .draw()?;

    chart.draw_series(LineSeries::new(series.iter().copied(), &GREEN))?;
    chart.draw_series(
        series
            .iter()
            .map(|(d, v)| Circle::new((*d, *v), 3, GREEN.filled())),
    )?;

    root.present()?;
    println!("  ✅ Saved {}", output_path.display());
    Ok(true)
}
