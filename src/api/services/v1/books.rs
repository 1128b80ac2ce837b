//! 图书目录端点（公开查询 + 后台管理）

use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, Result as ActixResult, web};
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::{error, info};

use crate::api::middleware::AdminUser;
use crate::errors::BookhavenError;
use crate::services::{BookInput, BookPatch, BookService, ImportMode};
use crate::utils::csv_handler::generate_export_filename;

use super::error_code::ErrorCode;
use super::helpers::{api_result, created_response, error_from_bookhaven, error_response};
use super::types::{BookListQuery, ImportQuery, MessageResponse, PaginatedResponse};

/// 最大导入文件大小 (10MB)
const MAX_IMPORT_FILE_SIZE: usize = 10 * 1024 * 1024;

pub async fn list_books(
    query: web::Query<BookListQuery>,
    books: web::Data<Arc<BookService>>,
) -> ActixResult<impl Responder> {
    let filter = match query.to_filter() {
        Ok(filter) => filter,
        Err(message) => return Ok(error_from_bookhaven(&BookhavenError::validation(message))),
    };

    let result = books
        .list(
            filter,
            query.page.unwrap_or(1),
            query.page_size.unwrap_or_default(),
        )
        .await
        .map(PaginatedResponse::from);
    Ok(api_result(result))
}

pub async fn list_genres(books: web::Data<Arc<BookService>>) -> ActixResult<impl Responder> {
    Ok(api_result(books.genres().await))
}

pub async fn get_book(
    path: web::Path<i32>,
    books: web::Data<Arc<BookService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(books.get(path.into_inner()).await))
}

pub async fn create_book(
    AdminUser(admin): AdminUser,
    body: web::Json<BookInput>,
    books: web::Data<Arc<BookService>>,
) -> ActixResult<impl Responder> {
    match books.create(body.into_inner()).await {
        Ok(book) => {
            info!("Admin {} created book {}", admin.id, book.id);
            Ok(created_response(book))
        }
        Err(e) => Ok(error_from_bookhaven(&e)),
    }
}

pub async fn update_book(
    AdminUser(_): AdminUser,
    path: web::Path<i32>,
    body: web::Json<BookPatch>,
    books: web::Data<Arc<BookService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        books.update(path.into_inner(), body.into_inner()).await,
    ))
}

pub async fn delete_book(
    AdminUser(admin): AdminUser,
    path: web::Path<i32>,
    books: web::Data<Arc<BookService>>,
) -> ActixResult<impl Responder> {
    let id = path.into_inner();
    let result = books.delete(id).await.map(|()| {
        info!("Admin {} deleted book {}", admin.id, id);
        MessageResponse::new("Book deleted")
    });
    Ok(api_result(result))
}

/// 导出全部图书为 CSV
pub async fn export_books(
    AdminUser(_): AdminUser,
    books: web::Data<Arc<BookService>>,
) -> ActixResult<impl Responder> {
    match books.export_csv().await {
        Ok(data) => {
            let filename = generate_export_filename();
            info!("Admin API: exported {} bytes to {}", data.len(), filename);
            Ok(HttpResponse::Ok()
                .content_type("text/csv; charset=utf-8")
                .insert_header((
                    "Content-Disposition",
                    format!("attachment; filename=\"{}\"", filename),
                ))
                .body(data))
        }
        Err(e) => {
            error!("Admin API: book export failed: {}", e);
            Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::ExportFailed,
                e.message(),
            ))
        }
    }
}

fn parse_mode(raw: &str) -> ImportMode {
    match raw.trim().to_lowercase().as_str() {
        "overwrite" => ImportMode::Overwrite,
        "error" => ImportMode::Error,
        _ => ImportMode::Skip,
    }
}

/// 从 multipart 上传的 CSV 导入图书
///
/// 字段：`file`（必需）、`mode`（skip / overwrite / error，也可放在 query 中）
pub async fn import_books(
    AdminUser(admin): AdminUser,
    query: web::Query<ImportQuery>,
    mut payload: Multipart,
    books: web::Data<Arc<BookService>>,
) -> ActixResult<impl Responder> {
    let mut csv_data: Option<Vec<u8>> = None;
    let mut mode = query.mode.unwrap_or_default();

    while let Some(item) = payload.next().await {
        let mut field = match item {
            Ok(f) => f,
            Err(e) => {
                error!("Failed to parse multipart field: {}", e);
                return Ok(error_response(
                    StatusCode::BAD_REQUEST,
                    ErrorCode::InvalidMultipartData,
                    &format!("Invalid multipart data: {}", e),
                ));
            }
        };

        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let mut data = Vec::new();
                while let Some(chunk) = field.next().await {
                    match chunk {
                        Ok(bytes) => {
                            if data.len() + bytes.len() > MAX_IMPORT_FILE_SIZE {
                                return Ok(error_response(
                                    StatusCode::BAD_REQUEST,
                                    ErrorCode::FileTooLarge,
                                    &format!(
                                        "File size exceeds maximum {} MB",
                                        MAX_IMPORT_FILE_SIZE / 1024 / 1024
                                    ),
                                ));
                            }
                            data.extend_from_slice(&bytes);
                        }
                        Err(e) => {
                            error!("Failed to read file chunk: {}", e);
                            return Ok(error_response(
                                StatusCode::BAD_REQUEST,
                                ErrorCode::InvalidMultipartData,
                                &format!("Failed to read file: {}", e),
                            ));
                        }
                    }
                }
                csv_data = Some(data);
            }
            "mode" => {
                let mut data = Vec::new();
                while let Some(chunk) = field.next().await {
                    if let Ok(bytes) = chunk {
                        data.extend_from_slice(&bytes);
                    }
                }
                mode = parse_mode(&String::from_utf8_lossy(&data));
            }
            _ => {}
        }
    }

    let csv_data = match csv_data {
        Some(data) if !data.is_empty() => data,
        _ => {
            return Ok(error_response(
                StatusCode::BAD_REQUEST,
                ErrorCode::CsvFileMissing,
                "No CSV file provided",
            ));
        }
    };

    info!(
        "Admin {}: import mode={:?}, file size={} bytes",
        admin.id,
        mode,
        csv_data.len()
    );
    Ok(api_result(books.import_csv(&csv_data, mode).await))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode_defaults_to_skip() {
        assert_eq!(parse_mode("Overwrite"), ImportMode::Overwrite);
        assert_eq!(parse_mode(" error "), ImportMode::Error);
        assert_eq!(parse_mode("whatever"), ImportMode::Skip);
    }
}
