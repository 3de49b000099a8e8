use crate::common_io::Delimiter;

/// Number of label columns (`sequential index`, `external id`)
/// prepended to every row by the labelled writers
pub const LABEL_COLUMNS: usize = 2;

/// How to label the rows of a written matrix
#[derive(Clone, Copy, Debug)]
pub enum RowLabels<'a> {
    /// values only
    Unlabelled,
    /// `i <delim> i <delim> values`
    Sequential,
    /// `i <delim> ids[i] <delim> values`; rows beyond `ids.len()`
    /// fall back to the index
    Translated(&'a [Box<str>]),
}

impl RowLabels<'_> {
    pub fn from_ids(ids: Option<&[Box<str>]>) -> RowLabels<'_> {
        match ids {
            Some(ids) => RowLabels::Translated(ids),
            None => RowLabels::Sequential,
        }
    }

    /// Label prefix of the `i`-th row (empty for unlabelled rows)
    pub fn prefix(&self, i: usize, delim: &str) -> String {
        match self {
            RowLabels::Unlabelled => String::new(),
            RowLabels::Sequential => format!("{}{}{}{}", i, delim, i, delim),
            RowLabels::Translated(ids) => match ids.get(i) {
                Some(id) => format!("{}{}{}{}", i, delim, id, delim),
                None => format!("{}{}{}{}", i, delim, i, delim),
            },
        }
    }
}

/// Operations to sample random matrices, only works for
/// `ndarray::Array2`
pub trait SampleOps {
    type Mat;
    type Scalar;

    /// Sample a matrix from a uniform distribution `U(0,1)`
    fn runif(dd: usize, nn: usize) -> Self::Mat;

    /// Sample a matrix from a normal distribution `N(0,1)`
    fn rnorm(dd: usize, nn: usize) -> Self::Mat;
}

/// Read and write matrices from and to files
pub trait IoOps {
    type Scalar;
    type Mat;

    /// Read a delimited file, ignoring the first `skip_cols` words
    /// of every line
    fn read_file_delim(
        file: &str,
        delim: impl Into<Delimiter>,
        skip_cols: usize,
    ) -> anyhow::Result<Self::Mat>;

    fn from_tsv(tsv_file: &str) -> anyhow::Result<Self::Mat> {
        Self::read_file_delim(tsv_file, "\t", 0)
    }

    /// Read a file written by `to_labelled_tsv`
    fn from_labelled_tsv(tsv_file: &str) -> anyhow::Result<Self::Mat> {
        Self::read_file_delim(tsv_file, "\t", LABEL_COLUMNS)
    }

    fn write_file_delim(
        &self,
        file: &str,
        delim: &str,
        labels: RowLabels,
    ) -> anyhow::Result<()>;

    fn to_tsv(&self, tsv_file: &str) -> anyhow::Result<()> {
        self.write_file_delim(tsv_file, "\t", RowLabels::Unlabelled)
    }

    /// Write rows prefixed by `i <tab> id[i]`
    ///
    /// * `ids` - translation of the sequential row index to an
    ///   external identifier (`None`: label by the index itself)
    fn to_labelled_tsv(&self, tsv_file: &str, ids: Option<&[Box<str>]>) -> anyhow::Result<()> {
        self.write_file_delim(tsv_file, "\t", RowLabels::from_ids(ids))
    }
}
