// SPDX-License-Identifier: MIT
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use super::format::LogEntry;
use super::reader::read_log_file;

const ZSTD_LEVEL: i32 = 3;

/// Writes one log file out as CSV, one row per entry. With `compress`, the
/// CSV is zstd-compressed.
///
/// # Errors
///
/// Returns an error if the log cannot be read or the output cannot be written.
pub fn export_file(input: &Path, output: &Path, compress: bool) -> Result<usize> {
    let entries = read_log_file(input)?;

    let file = File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let buf = BufWriter::new(file);

    if compress {
        let mut encoder =
            zstd::Encoder::new(buf, ZSTD_LEVEL).context("failed to create zstd encoder")?;
        write_csv(&mut encoder, &entries)?;
        let mut buf = encoder.finish().context("failed to finish zstd encoder")?;
        buf.flush().context("failed to flush CSV output")?;
    } else {
        let mut buf = buf;
        write_csv(&mut buf, &entries)?;
        buf.flush().context("failed to flush CSV output")?;
    }

    Ok(entries.len())
}

/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_csv(out: &mut impl Write, entries: &[LogEntry]) -> Result<()> {
    write_csv_header(out)?;
    for (index, entry) in entries.iter().enumerate() {
        write_csv_row(out, index, entry)?;
    }
    Ok(())
}

fn write_csv_header(out: &mut impl Write) -> Result<()> {
    writeln!(
        out,
        "index,timestamp,tracking_enabled,active_keys,mouse_x,mouse_y,\
         mouse_left,mouse_right,aim_distance,aim_angle,is_ads,\
         pos_x,pos_y,pos_z,pitch,yaw,roll,health,armor,weapon,\
         ammo_current,ammo_reserve,shots_fired,hits,score,kills,deaths,\
         game_time,sprinting,crouching,in_cover,in_combat,\
         process_cpu_percent,system_cpu_percent,memory_mb,runtime_secs"
    )
    .context("failed to write CSV header")
}

fn write_csv_row(out: &mut impl Write, index: usize, e: &LogEntry) -> Result<()> {
    let keys = e
        .input
        .active_keys
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    let weapon = match e.game_state.weapon {
        crate::game::state::WeaponSlot::Primary => "primary",
        crate::game::state::WeaponSlot::Secondary => "secondary",
    };
    let g = &e.game_state;
    let p = &e.performance;
    writeln!(
        out,
        "{index},{},{},\"{keys}\",{:.1},{:.1},{},{},{:.2},{:.2},{},\
         {:.4},{:.4},{:.4},{:.2},{:.2},{:.2},{},{},{weapon},\
         {},{},{},{},{},{},{},{:.3},{},{},{},{},{:.1},{:.1},{:.1},{:.3}",
        e.timestamp.to_rfc3339(),
        e.input.tracking_enabled,
        e.input.mouse_position.0,
        e.input.mouse_position.1,
        e.input.mouse_buttons.left,
        e.input.mouse_buttons.right,
        e.aim.distance_from_center,
        e.aim.angle_degrees,
        e.aim.is_ads,
        g.position.x,
        g.position.y,
        g.position.z,
        g.rotation.pitch,
        g.rotation.yaw,
        g.rotation.roll,
        g.health,
        g.armor,
        g.ammo.current,
        g.ammo.reserve,
        g.shots_fired,
        g.hits,
        g.score,
        g.kills,
        g.deaths,
        g.game_time,
        g.tactical.sprinting,
        g.tactical.crouching,
        g.tactical.in_cover,
        g.tactical.in_combat,
        p.process_cpu_percent,
        p.system_cpu_percent,
        p.memory_mb,
        p.runtime_secs,
    )
    .context("failed to write CSV row")
}
