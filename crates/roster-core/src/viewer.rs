use std::num::NonZeroUsize;

use async_trait::async_trait;
use tracing::{
  debug,
  info,
  warn
};

use crate::record::{
  Record,
  SortDirection,
  SortKey
};
use crate::transform::{
  self,
  SortSpec
};

#[async_trait]
pub trait RecordSource {
  async fn fetch_records(
    &self
  ) -> anyhow::Result<Vec<Record>>;
}

#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct ViewParams {
  pub query:     String,
  pub sort:      Option<SortSpec>,
  pub page:      usize,
  pub page_size: NonZeroUsize
}

impl ViewParams {
  pub fn new(
    page_size: NonZeroUsize
  ) -> Self {
    Self {
      query: String::new(),
      sort: None,
      page: 1,
      page_size
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum SortIndicator {
  None,
  Ascending,
  Descending
}

impl SortIndicator {
  pub fn as_str(self) -> &'static str {
    match self {
      | SortIndicator::None => "none",
      | SortIndicator::Ascending => {
        "ascending"
      }
      | SortIndicator::Descending => {
        "descending"
      }
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordPage<'a> {
  pub rows:          Vec<&'a Record>,
  pub page:          usize,
  pub total_pages:   usize,
  pub total_matches: usize
}

/// A loaded record set and the knobs
/// that shape its derived view.
#[derive(Debug, Clone)]
pub struct RecordView {
  records: Vec<Record>,
  params:  ViewParams
}

impl RecordView {
  pub fn new(
    records: Vec<Record>,
    page_size: NonZeroUsize
  ) -> Self {
    Self {
      records,
      params: ViewParams::new(page_size)
    }
  }

  pub fn params(&self) -> &ViewParams {
    &self.params
  }

  /// A new query invalidates the page
  /// position.
  #[tracing::instrument(skip(self))]
  pub fn set_search_query(
    &mut self,
    text: &str
  ) {
    self.params.query = text.to_string();
    self.params.page = 1;
  }

  #[tracing::instrument(skip(self))]
  pub fn set_sort(&mut self, key: SortKey) {
    let next = match self.params.sort {
      | Some(current)
        if current.key == key =>
      {
        SortSpec {
          key,
          direction: current
            .direction
            .flipped()
        }
      }
      | _ => SortSpec {
        key,
        direction:
          SortDirection::Ascending
      }
    };
    debug!(
      key = %next.key,
      direction = ?next.direction,
      "sort changed"
    );
    self.params.sort = Some(next);
  }

  #[tracing::instrument(skip(self))]
  pub fn set_page(&mut self, page: i64) {
    let total = self.total_pages();
    match transform::clamp_page(page, total)
    {
      | Some(clamped) => {
        self.params.page = clamped;
      }
      | None => {
        debug!("no pages; ignoring page change");
      }
    }
  }

  pub fn previous_page(&mut self) {
    let page = self.page_as_i64();
    self.set_page(page.saturating_sub(1));
  }

  pub fn next_page(&mut self) {
    let page = self.page_as_i64();
    self.set_page(page.saturating_add(1));
  }

  pub fn sort_indicator(
    &self,
    key: SortKey
  ) -> SortIndicator {
    match self.params.sort {
      | Some(spec) if spec.key == key => {
        match spec.direction {
          | SortDirection::Ascending => {
            SortIndicator::Ascending
          }
          | SortDirection::Descending => {
            SortIndicator::Descending
          }
        }
      }
      | _ => SortIndicator::None
    }
  }

  pub fn total_pages(&self) -> usize {
    let matched = transform::search(
      &self.records,
      &self.params.query
    )
    .len();
    transform::total_pages(
      matched,
      self.params.page_size
    )
  }

  /// Search, then sort, then the page
  /// window. The stored page is clamped
  /// into range before slicing.
  pub fn current_view(
    &self
  ) -> RecordPage<'_> {
    let mut rows = transform::search(
      &self.records,
      &self.params.query
    );
    if let Some(spec) = self.params.sort {
      transform::sort_records(
        &mut rows, spec
      );
    }

    let total_matches = rows.len();
    let total_pages =
      transform::total_pages(
        total_matches,
        self.params.page_size
      );
    let page = self
      .params
      .page
      .min(total_pages)
      .max(1);
    let window = transform::page_window(
      &rows,
      page,
      self.params.page_size
    );

    RecordPage {
      rows: window.to_vec(),
      page,
      total_pages,
      total_matches
    }
  }

  fn page_as_i64(&self) -> i64 {
    i64::try_from(self.params.page)
      .unwrap_or(i64::MAX)
  }
}

#[derive(Debug, Clone, Default)]
pub enum LoadState {
  #[default]
  Unloaded,
  Loading,
  Loaded(RecordView)
}

/// Owns the `Unloaded -> Loading ->
/// Loaded` lifecycle of one view
/// session. `Loaded` is terminal; a
/// failed fetch falls back to
/// `Unloaded` and is not retried.
#[derive(Debug, Clone)]
pub struct RecordViewer {
  state:     LoadState,
  page_size: NonZeroUsize
}

impl RecordViewer {
  pub fn new(
    page_size: NonZeroUsize
  ) -> Self {
    Self {
      state: LoadState::Unloaded,
      page_size
    }
  }

  pub fn state(&self) -> &LoadState {
    &self.state
  }

  pub fn view(
    &self
  ) -> Option<&RecordView> {
    match &self.state {
      | LoadState::Loaded(view) => {
        Some(view)
      }
      | _ => None
    }
  }

  pub fn view_mut(
    &mut self
  ) -> Option<&mut RecordView> {
    match &mut self.state {
      | LoadState::Loaded(view) => {
        Some(view)
      }
      | _ => None
    }
  }

  /// Returns false unless the viewer was
  /// `Unloaded`.
  pub fn begin_load(&mut self) -> bool {
    match self.state {
      | LoadState::Unloaded => {
        self.state = LoadState::Loading;
        true
      }
      | _ => false
    }
  }

  /// Results that arrive when no load
  /// is in flight are dropped.
  #[tracing::instrument(skip(self, result))]
  pub fn finish_load(
    &mut self,
    result: anyhow::Result<Vec<Record>>
  ) -> anyhow::Result<()> {
    if !matches!(
      self.state,
      LoadState::Loading
    ) {
      debug!("dropping stale load result");
      return Ok(());
    }

    match result {
      | Ok(records) => {
        info!(
          count = records.len(),
          "records loaded"
        );
        self.state = LoadState::Loaded(
          RecordView::new(
            records,
            self.page_size
          )
        );
        Ok(())
      }
      | Err(err) => {
        warn!(
          error = %err,
          "record load failed"
        );
        self.state = LoadState::Unloaded;
        Err(err)
      }
    }
  }

  /// Fetches at most once; a viewer that
  /// is already loaded returns its view
  /// without touching the source.
  #[tracing::instrument(skip(self, source))]
  pub async fn load<S>(
    &mut self,
    source: &S
  ) -> anyhow::Result<&mut RecordView>
  where
    S: RecordSource + ?Sized
  {
    if self.begin_load() {
      let fetched =
        source.fetch_records().await;
      self.finish_load(fetched)?;
    }

    self.view_mut().ok_or_else(|| {
      anyhow::anyhow!(
        "record viewer is not loaded"
      )
    })
  }
}
