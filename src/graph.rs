#![cfg(not(tarpaulin_include))]
#![cfg(feature = "web")]
use plotters::prelude::*;
use std::io::Cursor;

use crate::analytics::{CategoryTotal, EmissionTotals};

/// Configuration options for chart generation
#[derive(Clone, Debug)]
pub struct ChartOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the chart in pixels
    pub width: u32,

    /// Height of the chart in pixels
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: "Emissions".to_string(),
            y_label: "kg CO2e".to_string(),
            width: 800,
            height: 600,
        }
    }
}

/// Bar chart of the largest emission categories
///
/// # Arguments
/// * `categories` - Category totals, already sorted and truncated
/// * `options` - Chart styling options
///
/// # Returns
/// * PNG image data
pub fn category_chart(
    categories: &[CategoryTotal],
    options: &ChartOptions,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let bars: Vec<(String, f64)> = categories
        .iter()
        .map(|c| (c.category.clone(), c.emissions))
        .collect();
    bar_chart(&bars, options, &BLUE)
}

/// Bar chart of scope 1, 2 and 3 emissions
pub fn scope_chart(
    totals: &EmissionTotals,
    options: &ChartOptions,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let bars: Vec<(String, f64)> = totals
        .scopes()
        .iter()
        .map(|(label, value)| (label.to_string(), *value))
        .collect();
    bar_chart(&bars, options, &GREEN)
}

/// Render labelled bars into an in-memory PNG
///
/// # Implementation Notes
/// * Draws into an RGB buffer instead of a temporary file
/// * The Y axis always starts at 0; an empty or all-zero series still
///   renders an axis of height 1
fn bar_chart(
    bars: &[(String, f64)],
    options: &ChartOptions,
    color: &RGBColor,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let (width, height) = (options.width, options.height);
    let mut buffer = vec![0u8; (width * height * 3) as usize];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;

        let max_y = bars
            .iter()
            .map(|(_, value)| *value)
            .fold(0.0_f64, f64::max);
        let y_range = 0.0..if max_y > 0.0 { max_y * 1.1 } else { 1.0 };
        let bar_count = bars.len().max(1) as i32;

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d((0..bar_count).into_segmented(), y_range)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .y_desc(&options.y_label)
            .x_labels(bars.len().max(1))
            .x_label_formatter(&|segment| match segment {
                SegmentValue::CenterOf(index) | SegmentValue::Exact(index) => bars
                    .get(*index as usize)
                    .map(|(label, _)| label.clone())
                    .unwrap_or_default(),
                SegmentValue::Last => String::new(),
            })
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(color.filled())
                .margin(10)
                .data(
                    bars.iter()
                        .enumerate()
                        .map(|(index, (_, value))| (index as i32, *value)),
                ),
        )?;

        root.present()?;
    }

    let image = image::RgbImage::from_raw(width, height, buffer)
        .ok_or("chart buffer has unexpected size")?;
    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, image::ImageOutputFormat::Png)?;
    Ok(png.into_inner())
}
