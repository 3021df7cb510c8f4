//! Imagery source abstraction

use crate::error::Result;
use crate::geometry::AreaOfInterest;
use crate::image::Image;
use chrono::NaiveDate;

/// A filtered request against an image collection.
///
/// The date range is half-open: images acquired on `start` are included,
/// images acquired on `end` are not.
#[derive(Debug, Clone)]
pub struct CollectionQuery {
    pub collection_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub region: AreaOfInterest,
}

impl CollectionQuery {
    pub fn new(
        collection_id: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
        region: AreaOfInterest,
    ) -> Self {
        Self {
            collection_id: collection_id.into(),
            start,
            end,
            region,
        }
    }

    /// Whether `date` falls in `[start, end)`
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

/// Anything that can answer a [`CollectionQuery`] with images.
///
/// Implementations return every image of the collection whose footprint
/// intersects the query region and whose acquisition date is in range.
/// Images in one result share a grid. An empty result is not an error
/// here; callers decide what an empty collection means.
pub trait ImagerySource: Send + Sync {
    fn query_collection(&self, query: &CollectionQuery) -> Result<Vec<Image>>;
}

impl<S: ImagerySource + ?Sized> ImagerySource for &S {
    fn query_collection(&self, query: &CollectionQuery) -> Result<Vec<Image>> {
        (**self).query_collection(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_range_is_half_open() {
        let aoi = AreaOfInterest::from_bbox(0.0, 0.0, 1.0, 1.0).unwrap();
        let q = CollectionQuery::new(
            "LANDSAT/LC09/C02/T1_L2",
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            aoi,
        );
        assert!(q.contains_date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
        assert!(q.contains_date(NaiveDate::from_ymd_opt(2024, 8, 31).unwrap()));
        assert!(!q.contains_date(NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()));
        assert!(!q.contains_date(NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()));
    }
}
