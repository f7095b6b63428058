//! Grid shape selection by image count.

use crate::composer::ComposeError;

/// Workflow layout table: (rows, columns) for `count` images.
///
/// No layout exists beyond six images; callers must partition the tree
/// into sub-selections first.
pub(crate) fn grid_shape(count: usize) -> Result<(u32, u32), ComposeError> {
    match count {
        0 | 1 => Err(ComposeError::TooFewImages { count, required: 2 }),
        2 => Ok((2, 1)),
        3 | 4 => Ok((2, 2)),
        5 | 6 => Ok((3, 2)),
        _ => Err(ComposeError::TooManyImages { count, max: 6 }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_table_matches_workflow_rules() {
        assert_eq!(grid_shape(2).unwrap(), (2, 1));
        assert_eq!(grid_shape(3).unwrap(), (2, 2));
        assert_eq!(grid_shape(4).unwrap(), (2, 2));
        assert_eq!(grid_shape(5).unwrap(), (3, 2));
        assert_eq!(grid_shape(6).unwrap(), (3, 2));
    }

    #[test]
    fn seven_images_have_no_layout() {
        assert!(matches!(
            grid_shape(7),
            Err(ComposeError::TooManyImages { count: 7, max: 6 })
        ));
    }

    #[test]
    fn single_image_is_not_a_grid() {
        assert!(matches!(
            grid_shape(1),
            Err(ComposeError::TooFewImages { count: 1, .. })
        ));
    }
}
