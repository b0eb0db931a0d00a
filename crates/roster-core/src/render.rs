use std::io::{
  self,
  IsTerminal,
  Write
};

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::record::SortKey;
use crate::task::Task;
use crate::viewer::{
  RecordPage,
  RecordView,
  SortIndicator
};

const NO_RESULTS: &str =
  "No results found.";
const RECORD_COLUMNS: [(SortKey, &str);
  3] = [
  (SortKey::Name, "Name"),
  (SortKey::Username, "Username"),
  (SortKey::Email, "Email")
];

#[derive(Debug, Clone)]
pub struct Renderer {
  color: bool
}

impl Renderer {
  pub fn new(
    cfg: &Config
  ) -> anyhow::Result<Self> {
    let color = cfg.color()?
      && io::stdout().is_terminal();

    Ok(Self {
      color
    })
  }

  #[cfg(test)]
  pub fn plain() -> Self {
    Self {
      color: false
    }
  }

  #[tracing::instrument(skip(self, tasks))]
  pub fn print_tasks(
    &self,
    tasks: &[&Task]
  ) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    self.write_tasks(&mut out, tasks)
  }

  pub fn write_tasks<W: Write>(
    &self,
    mut out: W,
    tasks: &[&Task]
  ) -> anyhow::Result<()> {
    if tasks.is_empty() {
      writeln!(out, "No tasks.")?;
      return Ok(());
    }

    let headers = vec![
      "ID".to_string(),
      "Done".to_string(),
      "Title".to_string(),
    ];
    let rows = tasks
      .iter()
      .map(|task| {
        let mark = if task.completed {
          self.paint("[x]", "32")
        } else {
          "[ ]".to_string()
        };
        let title = if task.completed {
          self.paint(&task.title, "9")
        } else {
          task.title.clone()
        };
        vec![
          self.paint(
            &task.id.to_string(),
            "33"
          ),
          mark,
          title,
        ]
      })
      .collect();

    write_table(&mut out, headers, rows)
  }

  #[tracing::instrument(skip(self, view))]
  pub fn print_record_page(
    &self,
    view: &RecordView
  ) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    self.write_record_page(
      &mut out,
      view,
      &view.current_view()
    )
  }

  pub fn write_record_page<W: Write>(
    &self,
    mut out: W,
    view: &RecordView,
    page: &RecordPage<'_>
  ) -> anyhow::Result<()> {
    let headers = RECORD_COLUMNS
      .iter()
      .map(|(key, label)| {
        match view.sort_indicator(*key) {
          | SortIndicator::Ascending => {
            format!("{label} ▲")
          }
          | SortIndicator::Descending => {
            format!("{label} ▼")
          }
          | SortIndicator::None => {
            label.to_string()
          }
        }
      })
      .collect();

    let rows: Vec<Vec<String>> =
      if page.rows.is_empty() {
        vec![vec![
          NO_RESULTS.to_string(),
          String::new(),
          String::new(),
        ]]
      } else {
        page
          .rows
          .iter()
          .map(|record| {
            vec![
              record.name.clone(),
              record.username.clone(),
              self.paint(
                &record.email,
                "36"
              ),
            ]
          })
          .collect()
      };

    write_table(&mut out, headers, rows)?;
    writeln!(
      out,
      "{}",
      page_footer(page)
    )?;
    Ok(())
  }

  fn paint(
    &self,
    text: &str,
    code: &str
  ) -> String {
    if !self.color {
      return text.to_string();
    }
    format!("\x1b[{code}m{text}\x1b[0m")
  }
}

pub fn page_footer(
  page: &RecordPage<'_>
) -> String {
  if page.total_pages == 0 {
    return "Page 0 of 0 (0 matches)"
      .to_string();
  }
  let noun = if page.total_matches == 1 {
    "match"
  } else {
    "matches"
  };
  format!(
    "Page {} of {} ({} {noun})",
    page.page,
    page.total_pages,
    page.total_matches
  )
}

fn write_table<W: Write>(
  mut writer: W,
  headers: Vec<String>,
  rows: Vec<Vec<String>>
) -> anyhow::Result<()> {
  let mut widths: Vec<usize> = headers
    .iter()
    .map(|h| visible_width(h))
    .collect();

  for row in &rows {
    for (idx, cell) in
      row.iter().enumerate()
    {
      if let Some(width) =
        widths.get_mut(idx)
      {
        *width =
          (*width).max(visible_width(cell));
      }
    }
  }

  write_row(&mut writer, &headers, &widths)?;
  let rule: Vec<String> = widths
    .iter()
    .map(|w| "-".repeat(*w))
    .collect();
  write_row(&mut writer, &rule, &widths)?;
  for row in &rows {
    write_row(&mut writer, row, &widths)?;
  }

  Ok(())
}

fn write_row<W: Write>(
  writer: &mut W,
  cells: &[String],
  widths: &[usize]
) -> anyhow::Result<()> {
  let line = cells
    .iter()
    .zip(widths)
    .map(|(cell, width)| {
      let padding = width
        .saturating_sub(visible_width(cell));
      format!("{cell}{}", " ".repeat(padding))
    })
    .collect::<Vec<_>>()
    .join(" ");
  writeln!(writer, "{}", line.trim_end())?;
  Ok(())
}

fn visible_width(s: &str) -> usize {
  UnicodeWidthStr::width(
    strip_ansi(s).as_str()
  )
}

fn strip_ansi(s: &str) -> String {
  let mut out =
    String::with_capacity(s.len());
  let mut escaped = false;

  for ch in s.chars() {
    if escaped {
      if ch == 'm' {
        escaped = false;
      }
      continue;
    }

    if ch == '\x1b' {
      escaped = true;
      continue;
    }

    out.push(ch);
  }

  out
}

#[cfg(test)]
mod tests {
  use std::num::NonZeroUsize;

  use super::*;
  use crate::record::Record;
  use crate::task::TaskId;

  fn render_view(
    view: &RecordView
  ) -> String {
    let mut buf = Vec::new();
    Renderer::plain()
      .write_record_page(
        &mut buf,
        view,
        &view.current_view()
      )
      .unwrap();
    String::from_utf8(buf).unwrap()
  }

  #[test]
  fn sorted_column_gets_arrow() {
    let mut view = RecordView::new(
      vec![Record::new(
        1,
        "Leanne Graham",
        "Bret",
        "Sincere@april.biz"
      )],
      NonZeroUsize::new(5).unwrap()
    );
    view.set_sort(SortKey::Username);
    view.set_sort(SortKey::Username);

    let text = render_view(&view);
    let header =
      text.lines().next().unwrap();
    assert!(header.contains("Username ▼"));
    assert!(!header.contains("Name ▲"));
    assert!(text.contains("Sincere@april.biz"));
    assert!(
      text.trim_end().ends_with(
        "Page 1 of 1 (1 match)"
      )
    );
  }

  #[test]
  fn empty_page_says_no_results() {
    let mut view = RecordView::new(
      vec![],
      NonZeroUsize::new(5).unwrap()
    );
    view.set_search_query("x");
    let text = render_view(&view);
    assert!(text.contains(NO_RESULTS));
    assert!(text.contains("Page 0 of 0"));
  }

  #[test]
  fn task_rows_mark_completion() {
    let mut done = Task::new_active(
      TaskId(2),
      "ship it".to_string()
    );
    done.completed = true;
    let open = Task::new_active(
      TaskId(1),
      "write docs".to_string()
    );

    let mut buf = Vec::new();
    Renderer::plain()
      .write_tasks(&mut buf, &[&open, &done])
      .unwrap();
    let text =
      String::from_utf8(buf).unwrap();
    let lines: Vec<&str> =
      text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[2].contains("[ ]"));
    assert!(lines[3].contains("[x]"));
    assert!(lines[3].contains("ship it"));
  }

  #[test]
  fn ansi_codes_do_not_count_toward_width()
  {
    assert_eq!(
      visible_width("\x1b[33m42\x1b[0m"),
      2
    );
  }
}
