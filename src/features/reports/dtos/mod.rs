mod report_dto;

pub use report_dto::{
    is_mime_type_allowed, CreateReportDto, CreateReportForm, CreateReportResponseDto, PageSource,
    PhotoUpload, ReportListItemDto, ReportPageDto, ReportPageResponseDto, ALLOWED_MIME_TYPES,
};
